//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_tandem_config.toml"));
    let err = result.unwrap_err();
    assert!(matches!(err, tandem_common::ConfigError::FileNotFound(_)));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r##"
[server]
port = 8443

[chat]
max_message_length = 500
"##,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.port, 8443);
    assert_eq!(config.chat.max_message_length, 500);
    // Defaults preserved
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.chat.history_limit, 50);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, tandem_common::ConfigError::ParseError(_)));
}

#[test]
fn out_of_range_values_are_returned_as_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server]\nport = 80\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.port, 80);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tandem").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.port, 3001);
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;
    use crate::schema::TandemConfig;

    let config: TandemConfig = toml::from_str(&default_config_toml()).unwrap();
    assert_eq!(config.chat.typing_timeout_ms, 3000);
    assert!(crate::validation::validate(&config).is_ok());
}

#[test]
fn default_config_path_is_reasonable() {
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("tandem"));
        assert!(path_str.ends_with("config.toml"));
    }
}
