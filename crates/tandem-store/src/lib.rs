//! Chat message store.
//!
//! The single source of truth for chat history: an append-only log per room,
//! read back in insertion order. The relay persists through
//! [`MessageStore::append`] before it broadcasts, and sessions read history
//! through [`MessageStore::recent`] without involving the room coordinator.

mod journal;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tandem_common::{ChatMessage, ConfigError, NewMessage, StoreError};
use tandem_config::{ChatConfig, StoreBackend, StoreConfig};

pub use journal::JournalStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message, assigning its id and creation time.
    async fn append(&self, draft: NewMessage) -> Result<ChatMessage, StoreError>;

    /// The most recent `limit` messages of a room, oldest first.
    async fn recent(&self, room_id: &str, limit: usize) -> Result<Vec<ChatMessage>, StoreError>;

    /// Number of persisted messages in a room.
    async fn count(&self, room_id: &str) -> Result<usize, StoreError>;
}

/// Acceptance rules applied to every draft.
#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    pub max_message_length: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
        }
    }
}

impl From<&ChatConfig> for StoreLimits {
    fn from(chat: &ChatConfig) -> Self {
        Self {
            max_message_length: chat.max_message_length as usize,
        }
    }
}

impl StoreLimits {
    /// Reject drafts the store must not persist.
    pub fn check(&self, draft: &NewMessage) -> Result<(), StoreError> {
        if draft.room_id.is_empty() {
            return Err(StoreError::Invalid("room id is required".into()));
        }
        if draft.sender_id.is_empty() {
            return Err(StoreError::Invalid("sender id is required".into()));
        }
        if draft.text.trim().is_empty() {
            return Err(StoreError::Invalid("text is required".into()));
        }
        let len = draft.text.chars().count();
        if len > self.max_message_length {
            return Err(StoreError::Invalid(format!(
                "text is {len} characters, limit is {}",
                self.max_message_length
            )));
        }
        Ok(())
    }
}

/// Open the configured backend.
pub async fn open_store(
    store: &StoreConfig,
    chat: &ChatConfig,
) -> Result<Arc<dyn MessageStore>, OpenError> {
    let limits = StoreLimits::from(chat);
    match store.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new(limits))),
        StoreBackend::Journal => {
            let path = store.journal_path()?;
            Ok(Arc::new(JournalStore::open(&path, limits).await?))
        }
    }
}

/// Failure to bring a store up at startup.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Slice the newest `limit` entries, keeping them oldest first.
pub(crate) fn tail(messages: &[ChatMessage], limit: usize) -> Vec<ChatMessage> {
    let skip = messages.len().saturating_sub(limit);
    messages[skip..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_common::MessageKind;

    fn draft(text: &str) -> NewMessage {
        NewMessage {
            room_id: "r1".into(),
            sender_id: "u1".into(),
            text: text.into(),
            kind: MessageKind::Text,
        }
    }

    #[test]
    fn limits_reject_blank_text() {
        let limits = StoreLimits::default();
        assert!(matches!(limits.check(&draft("   ")), Err(StoreError::Invalid(_))));
        assert!(limits.check(&draft("hi")).is_ok());
    }

    #[test]
    fn limits_reject_long_text() {
        let limits = StoreLimits {
            max_message_length: 3,
        };
        assert!(limits.check(&draft("abc")).is_ok());
        assert!(limits.check(&draft("abcd")).is_err());
        // counted in characters, not bytes
        assert!(limits.check(&draft("ééé")).is_ok());
    }

    #[test]
    fn limits_require_ids() {
        let limits = StoreLimits::default();
        let mut d = draft("x");
        d.sender_id.clear();
        assert!(limits.check(&d).is_err());
        let mut d = draft("x");
        d.room_id.clear();
        assert!(limits.check(&d).is_err());
    }

    #[test]
    fn tail_keeps_newest_in_order() {
        let msgs: Vec<ChatMessage> = ["a", "b", "c"]
            .iter()
            .map(|t| ChatMessage::from_draft(draft(t)))
            .collect();
        let last_two: Vec<String> = tail(&msgs, 2).into_iter().map(|m| m.text).collect();
        assert_eq!(last_two, vec!["b", "c"]);
        assert_eq!(tail(&msgs, 10).len(), 3);
        assert!(tail(&msgs, 0).is_empty());
    }

    #[tokio::test]
    async fn open_memory_backend() {
        let store_cfg = StoreConfig {
            backend: StoreBackend::Memory,
            path: String::new(),
        };
        let store = open_store(&store_cfg, &ChatConfig::default()).await.unwrap();
        assert_eq!(store.count("r1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn open_journal_backend_at_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.jsonl");
        let store_cfg = StoreConfig {
            backend: StoreBackend::Journal,
            path: path.to_string_lossy().into_owned(),
        };
        let store = open_store(&store_cfg, &ChatConfig::default()).await.unwrap();
        store.append(draft("hello")).await.unwrap();
        assert!(path.exists());
    }
}
