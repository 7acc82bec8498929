//! Client-side chat log.
//!
//! The same message can arrive twice: once live and once in a history
//! reply. The store-assigned `_id` is the dedup key.

use std::collections::HashSet;

use tandem_common::ChatMessage;

#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
    seen: HashSet<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a live message. Returns false if it was already present.
    pub fn push(&mut self, msg: ChatMessage) -> bool {
        if !self.seen.insert(msg.id.clone()) {
            return false;
        }
        self.messages.push(msg);
        true
    }

    /// Fold a history reply in ahead of anything received live.
    ///
    /// Returns how many messages were new.
    pub fn merge_history(&mut self, history: Vec<ChatMessage>) -> usize {
        let fresh: Vec<ChatMessage> = history
            .into_iter()
            .filter(|m| self.seen.insert(m.id.clone()))
            .collect();
        let added = fresh.len();
        if added > 0 {
            let live = std::mem::replace(&mut self.messages, fresh);
            self.messages.extend(live);
        }
        added
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
