//! Typing indicators with client-side expiry.
//!
//! The relay keeps no typing state, so a lost `typing_stop` would leave an
//! indicator up forever. Each indicator instead lapses after the configured
//! timeout unless refreshed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tandem_common::ConnectionId;
use tandem_config::ChatConfig;

#[derive(Debug)]
pub struct TypingTracker {
    timeout: Duration,
    deadlines: HashMap<ConnectionId, Instant>,
}

impl TypingTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadlines: HashMap::new(),
        }
    }

    /// `peer` started (or is still) typing as of `now`.
    pub fn started(&mut self, peer: ConnectionId, now: Instant) {
        self.deadlines.insert(peer, now + self.timeout);
    }

    /// `peer` stopped typing or left. Returns whether an indicator was up.
    pub fn stopped(&mut self, peer: &ConnectionId) -> bool {
        self.deadlines.remove(peer).is_some()
    }

    pub fn is_typing(&self, peer: &ConnectionId, now: Instant) -> bool {
        self.deadlines.get(peer).is_some_and(|deadline| now < *deadline)
    }

    /// Drop lapsed indicators and return the peers whose indicator lapsed.
    pub fn expire(&mut self, now: Instant) -> Vec<ConnectionId> {
        let lapsed: Vec<ConnectionId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(peer, _)| peer.clone())
            .collect();
        for peer in &lapsed {
            self.deadlines.remove(peer);
        }
        lapsed
    }

    /// Peers currently shown as typing.
    pub fn active(&self, now: Instant) -> Vec<ConnectionId> {
        let mut peers: Vec<ConnectionId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| now < **deadline)
            .map(|(peer, _)| peer.clone())
            .collect();
        peers.sort();
        peers
    }
}

impl From<&ChatConfig> for TypingTracker {
    fn from(chat: &ChatConfig) -> Self {
        Self::new(Duration::from_millis(u64::from(chat.typing_timeout_ms)))
    }
}
