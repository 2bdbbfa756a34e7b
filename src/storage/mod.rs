//! Durable key/value records: one pretty-printed JSON file per record.

pub mod config_store;
pub mod path_utils;
pub mod pending_log;

use std::path::Path;

use serde::Serialize;

use crate::{ProactiveError, ProactiveResult};

/// Serialize `value` and replace `path` atomically (write `.tmp`, then rename).
/// Readers see either the previous record or the new one, never a partial write.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> ProactiveResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ProactiveError::Storage(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json).map_err(|e| {
        ProactiveError::Storage(format!("failed to write '{}': {}", tmp_path.display(), e))
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        ProactiveError::Storage(format!(
            "failed to rename '{}' to '{}': {}",
            tmp_path.display(),
            path.display(),
            e
        ))
    })
}
