use std::time::Duration;

use anyhow::{Context, Result};
use proactive_daemon::ipc_client;
use proactive_daemon::storage::path_utils;

/// Start the daemon in the background (no-op if one is already alive).
pub fn start() -> Result<()> {
    match spawn_if_needed()? {
        Some(pid) => println!("Daemon started (PID {})", pid),
        None => {
            let pid = read_pid().unwrap_or_default();
            println!("Daemon already running (PID {})", pid);
        }
    }
    Ok(())
}

/// Make sure a daemon answers on the socket, spawning one if needed.
/// Used by the host commands so `start` / `proactive on` work from cold.
pub fn ensure_running() -> Result<()> {
    if ipc_client::ping() {
        return Ok(());
    }
    spawn_if_needed()?;
    for _ in 0..25 {
        if ipc_client::ping() {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(200));
    }
    anyhow::bail!(
        "Daemon did not come up; see {}",
        path_utils::data_dir().join("daemon.log").display()
    )
}

/// Spawn `daemon run-foreground` unless the PID file names a live process.
/// Returns the new child PID, or None if a daemon was already running.
fn spawn_if_needed() -> Result<Option<u32>> {
    let pid_file = path_utils::pid_path();
    if let Some(pid) = read_pid() {
        if is_process_alive(&pid) {
            return Ok(None);
        }
        // Stale PID file
        let _ = std::fs::remove_file(&pid_file);
    }

    let self_bin = std::env::current_exe().context("Failed to get current exe")?;

    let mut child = std::process::Command::new(&self_bin)
        .args(["daemon", "run-foreground"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("Failed to start daemon")?;

    let pid = child.id();

    // Reaper thread: wait for the child so it never lingers as a zombie.
    std::thread::spawn(move || {
        let _ = child.wait();
    });

    Ok(Some(pid))
}

pub fn stop() -> Result<()> {
    let pid_file = path_utils::pid_path();

    match ipc_client::shutdown() {
        Ok(_) => {
            println!("Daemon shutdown requested via IPC");
            for _ in 0..10 {
                if !pid_file.exists() {
                    println!("Daemon stopped");
                    return Ok(());
                }
                std::thread::sleep(Duration::from_millis(200));
            }
            println!("Daemon may still be shutting down");
        }
        Err(_) => match read_pid() {
            Some(pid) => {
                kill_process(&pid);
                let _ = std::fs::remove_file(&pid_file);
                let _ = std::fs::remove_file(path_utils::socket_path());
                println!("Daemon stopped (killed PID {})", pid);
            }
            None => println!("Daemon is not running"),
        },
    }

    Ok(())
}

pub fn status() -> Result<()> {
    let pid = match read_pid() {
        Some(pid) => pid,
        None => {
            println!("Daemon: not running");
            return Ok(());
        }
    };

    if !is_process_alive(&pid) {
        println!("Daemon: stale PID file (process {} not found)", pid);
        return Ok(());
    }

    match ipc_client::status() {
        Ok(resp) => {
            println!("Daemon: running (PID {})", pid);
            if let Some(uptime) = resp.get("uptime_secs") {
                println!("Uptime: {}s", uptime);
            }
            let service_running = resp
                .get("running")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            println!("Service: {}", if service_running { "running" } else { "stopped" });
            if let Some(pending) = resp.get("pending_messages") {
                println!("Pending messages: {}", pending);
            }
            if let Some(sched) = resp.get("scheduler") {
                if let Some(phase) = sched.get("phase").and_then(|v| v.as_str()) {
                    println!("Scheduler: {}", phase);
                }
                if let Some(next) = sched.get("next_tick_in_ms").and_then(|v| v.as_u64()) {
                    println!("Next tick in: {}s", next / 1000);
                }
                if let Some(stats) = sched.get("stats") {
                    println!(
                        "Fetches: {}  delivered: {}  fallbacks: {}  skipped: {}",
                        stats.get("fetches").unwrap_or(&serde_json::json!(0)),
                        stats.get("delivered").unwrap_or(&serde_json::json!(0)),
                        stats.get("fallbacks").unwrap_or(&serde_json::json!(0)),
                        stats.get("skipped").unwrap_or(&serde_json::json!(0)),
                    );
                }
            }
        }
        Err(_) => {
            println!("Daemon: running (PID {}) but IPC unavailable", pid);
        }
    }

    Ok(())
}

fn read_pid() -> Option<String> {
    std::fs::read_to_string(path_utils::pid_path())
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn is_process_alive(pid_str: &str) -> bool {
    #[cfg(unix)]
    {
        match pid_str.parse::<i32>() {
            Ok(pid) => unsafe { libc::kill(pid, 0) == 0 },
            Err(_) => false,
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid_str;
        true
    }
}

fn kill_process(pid_str: &str) {
    #[cfg(unix)]
    {
        if let Ok(pid) = pid_str.parse::<i32>() {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = std::process::Command::new("taskkill")
            .args(["/PID", pid_str, "/F"])
            .output();
    }
}
