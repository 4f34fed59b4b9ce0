//! Tests for `src/logging.rs`.

use sos_dispatch::logging::LoggingGuard;

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_production_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs");
    assert!(!logs_dir.exists());

    // The global subscriber may already be installed by another test, so only
    // the directory side effect is asserted.
    let _result = sos_dispatch::logging::init_production(&logs_dir);
    assert!(logs_dir.exists(), "logs directory should be created");
}

#[test]
fn init_cli_is_idempotent() {
    sos_dispatch::logging::init_cli();
    sos_dispatch::logging::init_cli();
}

#[test]
fn dispatch_log_file_uses_sos_prefix() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs");

    let _result = sos_dispatch::logging::init_production(&logs_dir);
    let names: Vec<String> = std::fs::read_dir(&logs_dir)
        .expect("logs directory should be readable")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names
        .iter()
        .any(|name| name.starts_with(sos_dispatch::logging::DISPATCH_LOG_PREFIX)));
}
