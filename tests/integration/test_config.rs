//! Integration tests for loading `guess.json`.

use std::path::PathBuf;

use guess_game::{Config, ConsistencyMode, GameError};

/// Path to the fixtures directory.
fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Tests that the sample config loads and ignores unknown fields.
#[test]
fn test_sample_config_loads() {
    let config = Config::load_from_dir(&fixture_dir()).expect("Failed to load config");

    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 8080);
    assert_eq!(config.consistency, ConsistencyMode::LastWriteWins);
    assert_eq!(config.session_idle_timeout, 600);
    assert_eq!(config.sweep_interval, 30);
    assert_eq!(config.bind_address(), "0.0.0.0:8080");
}

/// Tests that a directory without `guess.json` yields defaults.
#[test]
fn test_missing_config_uses_defaults() {
    let dir = fixture_dir().join("does-not-exist");
    let config = Config::load_from_dir(&dir).expect("Failed to load defaults");
    assert_eq!(config, Config::default());
}

/// Tests that invalid JSON is reported as a fatal parse error.
#[test]
fn test_invalid_config_is_fatal() {
    let path = std::env::temp_dir().join(format!("guess-invalid-{}.json", std::process::id()));
    std::fs::write(&path, "{ \"port\": ").expect("Failed to write temp config");

    let err = Config::load_from_file(&path).expect_err("Invalid JSON should fail");
    std::fs::remove_file(&path).ok();

    assert!(matches!(err, GameError::ConfigParseError { .. }));
    assert!(err.is_fatal());
}
