use serde::{Deserialize, Serialize};

/// Chat limits shared by the relay and its clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// History entries returned when a client does not ask for a count (1-500).
    pub history_limit: u32,
    /// Upper clamp for client-supplied history counts.
    pub max_history_limit: u32,
    /// Longest accepted message, in characters (1-10000).
    pub max_message_length: u32,
    /// How long a peer's typing indicator survives without a refresh (500-30000 ms).
    pub typing_timeout_ms: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            max_history_limit: 500,
            max_message_length: 2000,
            typing_timeout_ms: 3000,
        }
    }
}

impl ChatConfig {
    /// Clamp a requested history size into `1..=max_history_limit`.
    pub fn clamp_history(&self, requested: Option<usize>) -> usize {
        let max = self.max_history_limit.max(1) as usize;
        requested
            .unwrap_or(self.history_limit as usize)
            .clamp(1, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_history_uses_default_when_absent() {
        let chat = ChatConfig::default();
        assert_eq!(chat.clamp_history(None), 50);
    }

    #[test]
    fn clamp_history_bounds_requests() {
        let chat = ChatConfig::default();
        assert_eq!(chat.clamp_history(Some(0)), 1);
        assert_eq!(chat.clamp_history(Some(20)), 20);
        assert_eq!(chat.clamp_history(Some(10_000)), 500);
    }
}
