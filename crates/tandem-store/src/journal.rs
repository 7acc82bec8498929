//! Durable store backed by an append-only JSON-lines journal.
//!
//! Every accepted message becomes one line in the journal. On open the file
//! is replayed into a per-room index so history reads never touch disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tandem_common::{ChatMessage, NewMessage, RoomId, StoreError};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::{tail, MessageStore, StoreLimits};

pub struct JournalStore {
    path: PathBuf,
    limits: StoreLimits,
    /// Held across write + index insert so index order equals file order.
    file: Mutex<JournalFile>,
    index: RwLock<HashMap<RoomId, Vec<ChatMessage>>>,
}

struct JournalFile {
    file: File,
    /// The file does not end in a newline: a crash or failed write left a
    /// partial line behind. The next append starts a fresh line first.
    torn: bool,
}

impl JournalStore {
    /// Open (or create) the journal at `path` and replay it.
    pub async fn open(path: &Path, limits: StoreLimits) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let (index, torn) = match tokio::fs::read_to_string(path).await {
            Ok(content) => (
                replay(&content, path),
                !content.is_empty() && !content.ends_with('\n'),
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (HashMap::new(), false),
            Err(e) => {
                return Err(StoreError::Corrupt(format!(
                    "cannot read journal {}: {e}",
                    path.display()
                )))
            }
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        let total: usize = index.values().map(Vec::len).sum();
        info!(path = %path.display(), messages = total, rooms = index.len(), "Journal opened");
        if torn {
            warn!(path = %path.display(), "Journal ends mid-line, next append starts a fresh line");
        }

        Ok(Self {
            path: path.to_path_buf(),
            limits,
            file: Mutex::new(JournalFile { file, torn }),
            index: RwLock::new(index),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JournalFile {
    /// Write one whole line or none of it. On failure the file is cut back
    /// to its previous length so a partial line never precedes the next one.
    async fn write_line(&mut self, line: &str, path: &Path) -> std::io::Result<()> {
        let start = self.file.metadata().await?.len();
        let written = async {
            self.file.write_all(line.as_bytes()).await?;
            self.file.flush().await
        }
        .await;
        match written {
            Ok(()) => {
                self.torn = false;
                Ok(())
            }
            Err(e) => {
                if let Err(cut) = self.file.set_len(start).await {
                    warn!(path = %path.display(), error = %cut, "Could not roll back partial journal line");
                    self.torn = true;
                }
                Err(e)
            }
        }
    }
}

/// Rebuild the room index from journal text, skipping lines that don't parse.
fn replay(content: &str, path: &Path) -> HashMap<RoomId, Vec<ChatMessage>> {
    let mut index: HashMap<RoomId, Vec<ChatMessage>> = HashMap::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ChatMessage>(line) {
            Ok(msg) => index.entry(msg.room_id.clone()).or_default().push(msg),
            Err(e) => {
                warn!(path = %path.display(), line = lineno + 1, error = %e, "Skipping malformed journal line");
            }
        }
    }
    index
}

#[async_trait]
impl MessageStore for JournalStore {
    async fn append(&self, draft: NewMessage) -> Result<ChatMessage, StoreError> {
        self.limits.check(&draft)?;
        let msg = ChatMessage::from_draft(draft);

        let mut line =
            serde_json::to_string(&msg).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        line.push('\n');

        let mut journal = self.file.lock().await;
        if journal.torn {
            line.insert(0, '\n');
        }
        journal.write_line(&line, &self.path).await?;

        self.index
            .write()
            .await
            .entry(msg.room_id.clone())
            .or_default()
            .push(msg.clone());
        drop(journal);

        Ok(msg)
    }

    async fn recent(&self, room_id: &str, limit: usize) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(match self.index.read().await.get(room_id) {
            Some(msgs) => tail(msgs, limit),
            None => Vec::new(),
        })
    }

    async fn count(&self, room_id: &str) -> Result<usize, StoreError> {
        Ok(self.index.read().await.get(room_id).map_or(0, Vec::len))
    }
}
