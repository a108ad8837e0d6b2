//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use crate::schema::CompanionConfig;
use companion_common::ConfigError;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_companion_relay.toml"));
    let err = result.unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(
        &path,
        r#"
[server]
port = 8080

[sessions]
idle_timeout_secs = 600
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.sessions.idle_timeout_secs, 600);
    // Defaults preserved
    assert_eq!(config.server.status_port, 3002);
    assert_eq!(config.sessions.max_code_attempts, 1000);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn load_out_of_range_values_still_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(&path, "[sessions]\nmax_code_attempts = 0\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.sessions.max_code_attempts, 0);
}

#[test]
fn create_default_config_writes_parseable_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("relay.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    let defaults = CompanionConfig::default();
    assert_eq!(config.server.port, defaults.server.port);
    assert_eq!(config.logging.level, defaults.logging.level);
}

#[test]
fn default_config_path_ends_with_relay_toml() {
    if let Ok(path) = default_config_path() {
        assert!(path.ends_with("companion/relay.toml"));
    }
}
