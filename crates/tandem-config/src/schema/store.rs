use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tandem_common::ConfigError;

/// Which message store backs chat history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum StoreBackend {
    /// Append-only JSON-lines file.
    #[default]
    Journal,
    /// Process memory only; history is lost on restart.
    Memory,
}

/// Message store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Journal file. Empty means `<data_dir>/tandem/messages.jsonl`.
    pub path: String,
}

impl StoreConfig {
    /// Resolve the journal location, falling back to the platform data dir.
    pub fn journal_path(&self) -> Result<PathBuf, ConfigError> {
        if !self.path.is_empty() {
            return Ok(PathBuf::from(&self.path));
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| ConfigError::ParseError("could not determine data directory".into()))?;
        Ok(data_dir.join("tandem").join("messages.jsonl"))
    }
}
