//! In-process store. History lives as long as the relay does.

use std::collections::HashMap;

use async_trait::async_trait;
use tandem_common::{ChatMessage, NewMessage, RoomId, StoreError};
use tokio::sync::RwLock;

use crate::{tail, MessageStore, StoreLimits};

pub struct MemoryStore {
    limits: StoreLimits,
    rooms: RwLock<HashMap<RoomId, Vec<ChatMessage>>>,
}

impl MemoryStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            limits,
            rooms: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, draft: NewMessage) -> Result<ChatMessage, StoreError> {
        self.limits.check(&draft)?;
        let msg = ChatMessage::from_draft(draft);
        self.rooms
            .write()
            .await
            .entry(msg.room_id.clone())
            .or_default()
            .push(msg.clone());
        Ok(msg)
    }

    async fn recent(&self, room_id: &str, limit: usize) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(match self.rooms.read().await.get(room_id) {
            Some(msgs) => tail(msgs, limit),
            None => Vec::new(),
        })
    }

    async fn count(&self, room_id: &str) -> Result<usize, StoreError> {
        Ok(self.rooms.read().await.get(room_id).map_or(0, Vec::len))
    }
}
