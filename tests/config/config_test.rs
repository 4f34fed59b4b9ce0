//! Coverage for config parsing and path resolution.

use std::path::Path;
use std::time::Duration;

use sos_dispatch::config::{
    config_dir, load_config, load_config_or_default, Config, RuntimePaths, StoreBackend,
    DEFAULT_EMERGENCY_PHONE,
};
use sos_dispatch::location::fixed::StaticProviders;
use sos_dispatch::types::PermissionKind;

#[test]
fn config_dir_resolves() {
    let dir = config_dir();
    assert!(dir.is_ok());
    let path = match dir {
        Ok(path) => path,
        Err(err) => panic!("config dir should resolve: {err}"),
    };
    assert!(path.ends_with(".sos-dispatch"));
}

#[test]
fn runtime_paths_live_under_root() {
    let paths = RuntimePaths::under(Path::new("/tmp/sos-home"));
    assert_eq!(paths.config_toml, Path::new("/tmp/sos-home/config.toml"));
    assert_eq!(paths.env_file, Path::new("/tmp/sos-home/.env"));
    assert_eq!(paths.store_db, Path::new("/tmp/sos-home/sos.db"));
    assert_eq!(paths.logs_dir, Path::new("/tmp/sos-home/logs"));
}

#[test]
fn parse_full_config() {
    let toml_str = r#"
language = "Hindi"

[contacts.emergency]
phone = "+911000000001"
name = "Block Health Officer"

[location]
max_fix_age_secs = 120

[[location.readings]]
provider = "network"
latitude = 26.85
longitude = 80.95
accuracy_m = 40.0

[[location.readings]]
provider = "gps"

[places]
enabled = false

[transport]
gateway_url = "https://sms.example.com/send"

[store]
backend = "rest"
rest_url = "https://docs.example.com"
ack_timeout_secs = 3

[permissions]
send_sms = false
"#;
    let config = match Config::from_toml(toml_str) {
        Ok(config) => config,
        Err(err) => panic!("config should parse: {err}"),
    };
    assert_eq!(config.language, "Hindi");
    let emergency = config.contacts.emergency.to_contact();
    assert_eq!(emergency.phone_number, "+911000000001");
    assert!(emergency.email.is_none());

    assert_eq!(config.location.readings.len(), 2);
    assert!(config.location.readings[0].to_stored().fix.is_some());
    assert!(config.location.readings[1].to_stored().fix.is_none());
    assert_eq!(config.location.max_age(), chrono::Duration::seconds(120));

    assert!(!config.places.enabled);
    assert_eq!(config.store.backend, StoreBackend::Rest);

    let grants = config.permissions.to_grants();
    assert!(grants.is_granted(PermissionKind::FineLocation));
    assert!(!grants.can_send_sms());

    let settings = config.engine_settings();
    assert_eq!(settings.ack_timeout, Duration::from_secs(3));
    assert_eq!(settings.place_query, "hospital");
    assert_eq!(settings.fallback_contact.phone_number, DEFAULT_EMERGENCY_PHONE);
}

#[test]
fn unknown_backend_is_rejected() {
    let result = Config::from_toml("[store]\nbackend = \"firestore\"\n");
    assert!(result.is_err());
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("config.toml");
    let config = match load_config_or_default(&path) {
        Ok(config) => config,
        Err(err) => panic!("defaults should load: {err}"),
    };
    assert_eq!(config.contacts.emergency.phone, DEFAULT_EMERGENCY_PHONE);
    assert!(load_config(&path).is_err());
}

#[test]
fn file_on_disk_is_loaded() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "language = \"Marathi\"\n").expect("should write config");
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(err) => panic!("config should load: {err}"),
    };
    assert_eq!(config.language, "Marathi");
}

#[test]
fn recorded_at_accepts_native_and_quoted_datetimes() {
    let toml_str = r#"
[location]
max_fix_age_secs = 120

[[location.readings]]
provider = "gps"
latitude = 1.0
longitude = 2.0
accuracy_m = 5.0
recorded_at = 2026-01-01T00:00:00Z

[[location.readings]]
provider = "network"
latitude = 1.1
longitude = 2.1
accuracy_m = 40.0
recorded_at = "2026-01-01T00:01:30+00:00"
"#;
    let config = match Config::from_toml(toml_str) {
        Ok(config) => config,
        Err(err) => panic!("config should parse: {err}"),
    };
    let gps_at = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
        .expect("literal should parse")
        .with_timezone(&chrono::Utc);
    let readings = &config.location.readings;
    assert_eq!(readings[0].recorded_at, Some(gps_at));
    assert_eq!(
        readings[1].recorded_at,
        Some(gps_at + chrono::Duration::seconds(90))
    );

    let stored = readings.iter().map(|r| r.to_stored()).collect();
    let providers = StaticProviders::new(stored, config.location.max_age());

    let fresh = providers.readings_at(gps_at + chrono::Duration::seconds(100));
    assert!(fresh[0].fix.is_some());
    assert!(fresh[1].fix.is_some());

    let later = providers.readings_at(gps_at + chrono::Duration::seconds(150));
    assert!(later[0].fix.is_none(), "gps fix is past the retention window");
    assert!(later[1].fix.is_some());
}

#[test]
fn recorded_at_without_offset_is_rejected() {
    let toml_str = r#"
[[location.readings]]
provider = "gps"
recorded_at = 2026-01-01T00:00:00
"#;
    assert!(Config::from_toml(toml_str).is_err());
}
