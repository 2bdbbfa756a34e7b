//! Pending message log: bounded FIFO of generated messages for the host.
//!
//! Storage file: `{data_dir}/pending_messages.json` (JSON array, most recent last).
//! Eviction is purely on length: once over capacity, the oldest entries go.

use std::path::{Path, PathBuf};

use crate::constants::MAX_PENDING_MESSAGES;
use crate::message::PendingMessage;
use crate::ProactiveResult;

use super::{path_utils, write_json_atomic};

#[derive(Debug, Clone)]
pub struct PendingMessageLog {
    path: PathBuf,
    capacity: usize,
}

impl PendingMessageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capacity: MAX_PENDING_MESSAGES,
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("pending_messages.json"))
    }

    pub fn default_location() -> Self {
        Self::new(path_utils::pending_log_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current sequence. Absent or unreadable record reads as empty.
    pub fn load(&self) -> Vec<PendingMessage> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Pending message log unreadable, starting over"
            );
            Vec::new()
        })
    }

    /// Append one message, evict from the front down to capacity, persist.
    pub fn append(&self, message: PendingMessage) -> ProactiveResult<()> {
        let mut messages = self.load();
        messages.push(message);
        if messages.len() > self.capacity {
            let excess = messages.len() - self.capacity;
            messages.drain(..excess);
        }
        write_json_atomic(&self.path, &messages)?;
        tracing::debug!(len = messages.len(), "Pending message persisted");
        Ok(())
    }
}
