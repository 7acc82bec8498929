//! tandem-client: one room, one connection.
//!
//! A [`RoomSession`] owns its socket for exactly as long as the user is in
//! the room. Chat dedup and typing expiry live here on the client, never on
//! the relay.

mod message_log;
mod session;
mod typing;

pub use message_log::MessageLog;
pub use session::{RoomSession, SessionEvent};
pub use typing::TypingTracker;

/// Errors surfaced by a room session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("session closed")]
    Closed,
}
