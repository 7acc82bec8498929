//! Chat data model shared by the store, the relay and the client.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Caller-chosen room name. A room exists only while it has members.
pub type RoomId = String;

/// What a chat entry carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Emoji,
}

/// A chat message before the store has accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub sender_id: String,
    pub text: String,
    pub kind: MessageKind,
}

/// A persisted chat message. Immutable once the store hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
    /// Logical user identity, not the connection id.
    #[serde(rename = "senderId")]
    pub sender_id: String,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl ChatMessage {
    /// Stamp a draft with a fresh id and the current UTC time.
    pub fn from_draft(draft: NewMessage) -> Self {
        Self {
            id: crate::id::new_id(),
            room_id: draft.room_id,
            sender_id: draft.sender_id,
            text: draft.text,
            kind: draft.kind,
            created_at: now_timestamp(),
        }
    }
}

/// RFC 3339 UTC timestamp with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
