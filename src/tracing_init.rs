//! Tracing initialization: daemon logs to a file, CLI logs to stderr.

use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::storage::path_utils;

/// Initialize tracing to `{data_dir}/daemon.log` (append mode).
///
/// Used by the daemon process. Respects `RUST_LOG`, default `info`.
pub fn init_daemon_tracing() {
    let data_dir = path_utils::data_dir();
    std::fs::create_dir_all(&data_dir).ok();
    let log_path = data_dir.join("daemon.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .or_else(|_| {
            let null = if cfg!(windows) { "NUL" } else { "/dev/null" };
            std::fs::OpenOptions::new().write(true).open(null)
        });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_ansi(false);

    // A second init (e.g. in-process relaunch) is harmless.
    let _ = match log_file {
        Ok(file) => builder.with_writer(Mutex::new(file)).try_init(),
        Err(_) => builder.with_writer(std::io::stderr).try_init(),
    };
}

/// Initialize tracing to stderr for short-lived CLI commands (default `warn`).
pub fn init_cli_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
