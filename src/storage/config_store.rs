//! Config persistence: `{data_dir}/config.json`.
//!
//! Missing file or missing keys mean "use default"; a corrupt file is logged
//! and replaced by defaults in memory (never fatal).

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::ProactiveResult;

use super::{path_utils, write_json_atomic};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store rooted in a directory (`{dir}/config.json`).
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("config.json"))
    }

    /// Store at the standard data-dir location.
    pub fn default_location() -> Self {
        Self::new(path_utils::config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Config {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Invalid config, using defaults"
                );
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    pub fn save(&self, config: &Config) -> ProactiveResult<()> {
        write_json_atomic(&self.path, config)?;
        tracing::debug!(
            proactive_enabled = config.proactive_enabled,
            proactive_random_enabled = config.proactive_random_enabled,
            interval_ms = config.interval_ms,
            "Config saved"
        );
        Ok(())
    }
}
