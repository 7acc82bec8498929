use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Reasons a room operation is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room is full: {0}")]
    RoomFull(String),

    #[error("invalid room id: {0:?}")]
    InvalidRoomId(String),

    #[error("connection {connection} is not a member of room {room}")]
    NotAMember { room: String, connection: String },
}

/// Message store failures. Any of these suppresses the chat broadcast.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid message: {0}")]
    Invalid(String),

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store corrupt: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("target connection is gone: {0}")]
    StaleTarget(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TandemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Relay(#[from] RelayError),

}
