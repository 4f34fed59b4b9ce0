//! Configuration loading and validation.
//!
//! Everything lives under `~/.sos-dispatch/`:
//! - `config.toml`: contacts, providers, transport, and store settings
//! - `.env`: secrets such as the SMS gateway token (never in `config.toml`)
//! - `sos.db`: local document store
//! - `logs/`: rotated JSON logs
//!
//! Every section has defaults, so an empty `config.toml` is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::engine::EngineSettings;
use crate::host::PermissionGrants;
use crate::location::fixed::StoredReading;
use crate::types::{Contact, LocationFix, PermissionKind};

/// Built-in emergency number used when none is configured.
pub const DEFAULT_EMERGENCY_PHONE: &str = "+919876543210";
/// Name of the built-in emergency contact.
pub const DEFAULT_EMERGENCY_NAME: &str = "Default Emergency";
/// Email of the built-in emergency contact.
pub const DEFAULT_EMERGENCY_EMAIL: &str = "abc@gmail.com";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// UI language recorded with each SOS.
    pub language: String,

    /// Emergency contact settings.
    pub contacts: ContactsConfig,

    /// Location provider readings and retention.
    pub location: LocationConfig,

    /// Place enrichment settings.
    pub places: PlacesConfig,

    /// SMS transport settings.
    pub transport: TransportConfig,

    /// Audit store settings.
    pub store: StoreConfig,

    /// Permission grants reported by the CLI host.
    pub permissions: PermissionsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: default_language(),
            contacts: ContactsConfig::default(),
            location: LocationConfig::default(),
            places: PlacesConfig::default(),
            transport: TransportConfig::default(),
            store: StoreConfig::default(),
            permissions: PermissionsConfig::default(),
        }
    }
}

impl Config {
    /// Parse a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))
    }

    /// Engine settings derived from this config.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            place_query: self.places.query.clone(),
            place_timeout: Duration::from_secs(self.places.timeout_secs),
            ack_timeout: Duration::from_secs(self.store.ack_timeout_secs),
            fallback_contact: default_emergency_contact(),
        }
    }
}

/// The built-in emergency contact.
pub fn default_emergency_contact() -> Contact {
    Contact::new(DEFAULT_EMERGENCY_PHONE, DEFAULT_EMERGENCY_NAME)
        .with_email(DEFAULT_EMERGENCY_EMAIL)
}

/// A contact as written in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactConfig {
    /// Phone number.
    pub phone: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Optional email.
    #[serde(default)]
    pub email: Option<String>,
}

impl ContactConfig {
    /// Convert into a [`Contact`].
    pub fn to_contact(&self) -> Contact {
        Contact {
            phone_number: self.phone.clone(),
            display_name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Emergency contact settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactsConfig {
    /// The always-notified primary contact.
    #[serde(default = "default_emergency_config")]
    pub emergency: ContactConfig,
}

impl Default for ContactsConfig {
    fn default() -> Self {
        Self {
            emergency: default_emergency_config(),
        }
    }
}

/// One provider's cached reading.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingConfig {
    /// Provider name (`gps`, `network`, `passive`, ...).
    pub provider: String,
    /// Latitude; omit with longitude for a provider without a fix.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Accuracy radius in meters.
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    /// When the reading was taken, as a TOML offset datetime or an RFC 3339
    /// string. Omitted means "now".
    #[serde(default, deserialize_with = "deserialize_recorded_at")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl ReadingConfig {
    /// Convert into a stored reading. A fix needs latitude, longitude, and accuracy.
    pub fn to_stored(&self) -> StoredReading {
        let fix = match (self.latitude, self.longitude, self.accuracy_m) {
            (Some(latitude), Some(longitude), Some(accuracy_meters)) => Some(LocationFix {
                latitude,
                longitude,
                accuracy_meters,
                provider: self.provider.clone(),
            }),
            _ => None,
        };
        StoredReading {
            provider: self.provider.clone(),
            fix,
            recorded_at: self.recorded_at,
        }
    }
}

fn deserialize_recorded_at<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match Option::<toml::Value>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(toml::Value::Datetime(datetime)) => datetime.to_string(),
        Some(toml::Value::String(text)) => text,
        Some(other) => {
            return Err(D::Error::custom(format!(
                "recorded_at must be a datetime, got {}",
                other.type_str()
            )))
        }
    };
    DateTime::parse_from_rfc3339(&text)
        .map(|at| Some(at.with_timezone(&Utc)))
        .map_err(|e| D::Error::custom(format!("recorded_at {text:?} needs a UTC offset: {e}")))
}

/// Location provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    /// Cached fixes older than this are treated as absent.
    #[serde(default = "default_max_fix_age_secs")]
    pub max_fix_age_secs: u64,

    /// Enabled providers in platform order.
    #[serde(default)]
    pub readings: Vec<ReadingConfig>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            max_fix_age_secs: default_max_fix_age_secs(),
            readings: Vec::new(),
        }
    }
}

impl LocationConfig {
    /// Retention window as a chrono duration.
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.max_fix_age_secs).unwrap_or(i64::MAX))
    }
}

/// Place enrichment settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacesConfig {
    /// Whether to attempt enrichment at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Geocoder search endpoint.
    #[serde(default = "default_places_endpoint")]
    pub endpoint: String,

    /// Search term sent with the coordinates.
    #[serde(default = "default_places_query")]
    pub query: String,

    /// `User-Agent` header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Lookup timeout in seconds.
    #[serde(default = "default_places_timeout")]
    pub timeout_secs: u64,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_places_endpoint(),
            query: default_places_query(),
            user_agent: default_user_agent(),
            timeout_secs: default_places_timeout(),
        }
    }
}

/// SMS transport settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// HTTP gateway URL. Absent means dry-run (log only).
    #[serde(default)]
    pub gateway_url: Option<String>,

    /// Environment variable holding the gateway bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_transport_timeout")]
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            token_env: default_token_env(),
            timeout_secs: default_transport_timeout(),
        }
    }
}

/// Which document store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local SQLite file.
    #[default]
    Sqlite,
    /// Remote HTTP document service.
    Rest,
}

/// Audit store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite path. Defaults to `~/.sos-dispatch/sos.db`.
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,

    /// Base URL for the REST backend.
    #[serde(default)]
    pub rest_url: Option<String>,

    /// REST request timeout in seconds.
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Seconds `send` waits for the audit write before reporting.
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sqlite_path: None,
            rest_url: None,
            timeout_secs: default_store_timeout(),
            ack_timeout_secs: default_ack_timeout(),
        }
    }
}

/// Permission grants the CLI host reports.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsConfig {
    /// Precise location.
    #[serde(default = "default_true")]
    pub fine_location: bool,
    /// Approximate location.
    #[serde(default = "default_true")]
    pub coarse_location: bool,
    /// SMS sending.
    #[serde(default = "default_true")]
    pub send_sms: bool,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            fine_location: true,
            coarse_location: true,
            send_sms: true,
        }
    }
}

impl PermissionsConfig {
    /// Convert into permission grants.
    pub fn to_grants(&self) -> PermissionGrants {
        PermissionGrants::none()
            .with(PermissionKind::FineLocation, self.fine_location)
            .with(PermissionKind::CoarseLocation, self.coarse_location)
            .with(PermissionKind::SendSms, self.send_sms)
    }
}

// Default value functions for serde

fn default_language() -> String {
    "English".to_owned()
}
fn default_emergency_config() -> ContactConfig {
    ContactConfig {
        phone: DEFAULT_EMERGENCY_PHONE.to_owned(),
        name: DEFAULT_EMERGENCY_NAME.to_owned(),
        email: Some(DEFAULT_EMERGENCY_EMAIL.to_owned()),
    }
}
fn default_true() -> bool {
    true
}
fn default_max_fix_age_secs() -> u64 {
    600
}
fn default_places_endpoint() -> String {
    crate::places::DEFAULT_ENDPOINT.to_owned()
}
fn default_places_query() -> String {
    "hospital".to_owned()
}
fn default_user_agent() -> String {
    crate::places::DEFAULT_USER_AGENT.to_owned()
}
fn default_places_timeout() -> u64 {
    crate::places::DEFAULT_TIMEOUT_SECS
}
fn default_token_env() -> String {
    "SOS_GATEWAY_TOKEN".to_owned()
}
fn default_transport_timeout() -> u64 {
    30
}
fn default_store_timeout() -> u64 {
    10
}
fn default_ack_timeout() -> u64 {
    5
}

/// Starter `config.toml` written by `sos init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"language = "English"

[contacts.emergency]
phone = "+919876543210"
name = "Default Emergency"
email = "abc@gmail.com"

[location]
max_fix_age_secs = 600

# [[location.readings]]
# provider = "gps"
# latitude = 28.6139
# longitude = 77.209
# accuracy_m = 12.0

[places]
enabled = true
query = "hospital"

[transport]
# gateway_url = "https://sms.example.com/send"
token_env = "SOS_GATEWAY_TOKEN"

[store]
backend = "sqlite"
ack_timeout_secs = 5

[permissions]
fine_location = true
coarse_location = true
send_sms = true
"#;

/// Load config from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Load config from `path` if it exists, otherwise return defaults.
///
/// # Errors
///
/// Returns an error if an existing file cannot be read or parsed.
pub fn load_config_or_default(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(path = %path.display(), "no config file found, using defaults");
        Ok(Config::default())
    }
}

/// Resolve the default config directory (`~/.sos-dispatch/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".sos-dispatch"))
}

/// Well-known paths under a runtime root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// Root directory.
    pub root: PathBuf,
    /// `config.toml`.
    pub config_toml: PathBuf,
    /// `.env` secrets file.
    pub env_file: PathBuf,
    /// Default SQLite store.
    pub store_db: PathBuf,
    /// Log directory.
    pub logs_dir: PathBuf,
}

impl RuntimePaths {
    /// Paths rooted at `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            config_toml: root.join("config.toml"),
            env_file: root.join(".env"),
            store_db: root.join("sos.db"),
            logs_dir: root.join("logs"),
        }
    }
}

/// Runtime paths under [`config_dir`].
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn runtime_paths() -> anyhow::Result<RuntimePaths> {
    Ok(RuntimePaths::under(&config_dir()?))
}
