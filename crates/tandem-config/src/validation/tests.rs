use super::*;
use crate::schema::TandemConfig;

#[test]
fn default_config_is_valid() {
    assert!(validate(&TandemConfig::default()).is_ok());
}

#[test]
fn port_below_range_is_rejected() {
    let mut config = TandemConfig::default();
    config.server.port = 80;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port = 80 is out of range [1024, 65535]"));
}

#[test]
fn errors_are_collected() {
    let mut config = TandemConfig::default();
    config.server.port = 70_000;
    config.chat.max_message_length = 0;
    config.chat.typing_timeout_ms = 10;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port"));
    assert!(err.contains("chat.max_message_length"));
    assert!(err.contains("chat.typing_timeout_ms"));
    assert_eq!(err.matches("; ").count(), 2);
}

#[test]
fn bad_room_pattern_is_reported() {
    let mut config = TandemConfig::default();
    config.rooms.id_pattern = "[unclosed".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("rooms.id_pattern"));
}

#[test]
fn history_limit_cannot_exceed_max() {
    let mut config = TandemConfig::default();
    config.chat.history_limit = 400;
    config.chat.max_history_limit = 100;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("exceeds chat.max_history_limit"));
}

#[test]
fn empty_host_is_rejected() {
    let mut config = TandemConfig::default();
    config.server.host = "  ".into();
    assert!(validate(&config).is_err());
}

#[test]
fn outbox_capacity_bounds_and_warn_depth() {
    let mut config = TandemConfig::default();
    config.server.outbox_capacity = 8;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.outbox_capacity = 8 is out of range [16, 65536]"));
    assert!(err.contains("must be below server.outbox_capacity"));

    let mut config = TandemConfig::default();
    config.server.outbox_warn_depth = 2048;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.outbox_warn_depth = 2048 must be below"));
}
