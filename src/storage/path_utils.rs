use std::path::PathBuf;

use crate::constants::DATA_DIR_ENV;

/// Centralized cross-platform data directory.
/// Linux: ~/.config/proactive-daemon/
/// macOS: ~/Library/Application Support/proactive-daemon/
/// Windows: %APPDATA%/proactive-daemon/
///
/// `PROACTIVE_DAEMON_DATA_DIR` overrides the location.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(expand_tilde(&dir));
        }
    }
    let base = dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });
    base.join("proactive-daemon")
}

/// {data_dir}/config.json
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// {data_dir}/pending_messages.json
pub fn pending_log_path() -> PathBuf {
    data_dir().join("pending_messages.json")
}

/// {data_dir}/daemon.pid
pub fn pid_path() -> PathBuf {
    data_dir().join("daemon.pid")
}

/// {data_dir}/daemon.sock
pub fn socket_path() -> PathBuf {
    data_dir().join("daemon.sock")
}

/// Expand ~ to home directory in paths.
pub fn expand_tilde(path: &str) -> String {
    if path.starts_with("~/") || path == "~" {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("/var/lib/x"), "/var/lib/x");
        assert_eq!(expand_tilde("relative/~x"), "relative/~x");
    }

    #[test]
    fn test_files_live_under_data_dir() {
        let dir = data_dir();
        assert!(config_path().starts_with(&dir));
        assert!(pending_log_path().starts_with(&dir));
        assert!(socket_path().starts_with(&dir));
    }
}
