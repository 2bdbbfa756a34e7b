use anyhow::{Context, Result};
use proactive_daemon::config::StartRequest;
use proactive_daemon::ipc_client;
use proactive_daemon::storage::pending_log::PendingMessageLog;

/// `start`: merge the given config into the persisted one and (re)arm.
pub fn start(request: StartRequest) -> Result<()> {
    super::daemon::ensure_running()?;
    ipc_client::start(&request).context("Start command failed")?;

    let status = ipc_client::status().context("Failed to query daemon status")?;
    let complete = status
        .get("scheduler")
        .and_then(|s| s.get("config"))
        .map(|c| {
            ["api_key", "api_url"]
                .iter()
                .all(|k| c.get(*k).and_then(|v| v.as_str()).is_some_and(|s| !s.is_empty()))
        })
        .unwrap_or(false);

    println!("Proactive service running");
    if !complete {
        println!("Note: api key or api url missing, ticks will be skipped until both are set");
    }
    Ok(())
}

/// `stop`: stop scheduling; the daemon stays up.
pub fn stop() -> Result<()> {
    if !ipc_client::ping() {
        println!("Daemon is not running");
        return Ok(());
    }
    ipc_client::stop().context("Stop command failed")?;
    println!("Proactive service stopped");
    Ok(())
}

/// `proactive <on|off>`: persisted toggle; promotes the service to running.
pub fn proactive(enabled: bool) -> Result<()> {
    super::daemon::ensure_running()?;
    ipc_client::set_proactive_mode(enabled).context("Toggle failed")?;
    println!("Proactive mode {}", if enabled { "on" } else { "off" });
    Ok(())
}

/// `is-running`: prints `true`/`false`; an unreachable daemon is `false`.
pub fn is_running() -> Result<()> {
    let running = if ipc_client::ping() {
        ipc_client::is_running().context("is_running query failed")?
    } else {
        false
    };
    println!("{}", running);
    Ok(())
}

/// `pending`: list the backlog. Reads the file directly when the daemon is down.
pub fn pending(json: bool) -> Result<()> {
    let messages = match ipc_client::pending() {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(error = %e, "Daemon unavailable, reading backlog from disk");
            PendingMessageLog::default_location().load()
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!("No pending messages");
        return Ok(());
    }
    for (i, m) in messages.iter().enumerate() {
        println!("{:>3}. [{}] {}", i + 1, m.role, m.content);
    }
    Ok(())
}
