//! Wire protocol between a room session and the relay.
//!
//! One JSON object per WebSocket text frame, discriminated by an `"event"`
//! key. Handshake payloads are routed by `target` only; every other field is
//! carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::ConnectionId;
use crate::types::{ChatMessage, MessageKind, RoomId};

/// An offer, answer or ICE candidate. Only `target` is read by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    pub target: ConnectionId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl HandshakePayload {
    pub fn new(target: ConnectionId) -> Self {
        Self {
            target,
            fields: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Events a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room_id: RoomId,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    Offer(HandshakePayload),
    Answer(HandshakePayload),
    #[serde(rename = "ice-candidate")]
    IceCandidate(HandshakePayload),
    SendMessage {
        room_id: RoomId,
        sender_id: String,
        text: String,
        #[serde(rename = "type", default)]
        kind: MessageKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_temp_id: Option<String>,
    },
    TypingStart {
        room_id: RoomId,
    },
    TypingStop {
        room_id: RoomId,
    },
    FetchHistory {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
}

/// Events the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// First frame of every session.
    Connected {
        connection_id: ConnectionId,
    },
    RoomFull,
    /// Sent only to the member that was already waiting.
    UserJoined {
        connection_id: ConnectionId,
    },
    Offer(HandshakePayload),
    Answer(HandshakePayload),
    #[serde(rename = "ice-candidate")]
    IceCandidate(HandshakePayload),
    ReceiveMessage(ChatMessage),
    MessageFailed {
        room_id: RoomId,
        client_temp_id: Option<String>,
    },
    DisplayTyping {
        sender_id: ConnectionId,
    },
    HideTyping {
        sender_id: ConnectionId,
    },
    PeerLeft {
        connection_id: ConnectionId,
    },
    ChatHistory {
        room_id: RoomId,
        messages: Vec<ChatMessage>,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    /// Wire name, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::RoomFull => "room_full",
            Self::UserJoined { .. } => "user_joined",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::IceCandidate(_) => "ice-candidate",
            Self::ReceiveMessage(_) => "receive_message",
            Self::MessageFailed { .. } => "message_failed",
            Self::DisplayTyping { .. } => "display_typing",
            Self::HideTyping { .. } => "hide_typing",
            Self::PeerLeft { .. } => "peer_left",
            Self::ChatHistory { .. } => "chat_history",
            Self::Error { .. } => "error",
        }
    }
}
