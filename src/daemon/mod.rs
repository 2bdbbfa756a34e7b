pub mod ipc_server;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proactive_daemon::config::StartRequest;
use proactive_daemon::fetcher::HttpFetcher;
use proactive_daemon::service::{SelfRespawn, ServiceLifecycleManager};
use proactive_daemon::storage::config_store::ConfigStore;
use proactive_daemon::storage::path_utils;
use proactive_daemon::storage::pending_log::PendingMessageLog;

pub type SharedManager = Arc<Mutex<ServiceLifecycleManager>>;

/// Run the daemon in foreground mode.
///
/// Architecture:
///   - IPC server: 1 thread per connection, all host commands go through the
///     shared `ServiceLifecycleManager`
///   - Scheduler runtime: control thread + single fetch worker (owned by the manager)
///   - Main thread: waits for shutdown (IPC / SIGINT / SIGTERM) or host
///     teardown (IPC / SIGHUP), which ends in a relaunch request
pub fn run(resume: bool) {
    proactive_daemon::tracing_init::init_daemon_tracing();

    let data_dir = path_utils::data_dir();
    std::fs::create_dir_all(&data_dir).ok();

    let store = ConfigStore::default_location();
    let config = store.load();
    tracing::info!(
        data_dir = %data_dir.display(),
        resume,
        config_complete = config.is_complete(),
        proactive_enabled = config.proactive_enabled,
        "Starting proactive daemon"
    );

    let manager = match ServiceLifecycleManager::new(
        store,
        PendingMessageLog::default_location(),
        Arc::new(HttpFetcher::new()),
        Arc::new(SelfRespawn),
    ) {
        Ok(m) => Arc::new(Mutex::new(m)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start scheduler runtime");
            return;
        }
    };

    let pid_path = path_utils::pid_path();
    std::fs::write(&pid_path, std::process::id().to_string()).ok();

    // Relaunched after a host teardown: pick up the persisted config.
    if resume {
        if let Ok(mut mgr) = manager.lock() {
            if let Err(e) = mgr.on_start(StartRequest::default()) {
                tracing::error!(error = %e, "Resume failed");
            }
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let stop_requested = Arc::new(AtomicBool::new(false));
    let teardown_requested = Arc::new(AtomicBool::new(false));

    let socket_path = path_utils::socket_path();

    let ipc_handle = {
        let manager = manager.clone();
        let running = running.clone();
        let teardown = teardown_requested.clone();
        let sock = socket_path.clone();
        std::thread::spawn(move || {
            if let Err(e) = ipc_server::run(&sock, manager, running, teardown) {
                tracing::error!("IPC server error: {}", e);
            }
        })
    };

    signal_hook::flag::register(signal_hook::consts::SIGINT, stop_requested.clone()).ok();
    #[cfg(unix)]
    {
        signal_hook::flag::register(signal_hook::consts::SIGTERM, stop_requested.clone()).ok();
        signal_hook::flag::register(signal_hook::consts::SIGHUP, teardown_requested.clone())
            .ok();
    }

    while running.load(Ordering::Relaxed) {
        if stop_requested.load(Ordering::Relaxed) || teardown_requested.load(Ordering::Relaxed) {
            break;
        }
        std::thread::sleep(Duration::from_millis(200));
    }
    running.store(false, Ordering::Relaxed);

    let teardown = teardown_requested.load(Ordering::Relaxed);
    tracing::info!(teardown, "Shutting down...");

    // Unblock accept() and release the socket before any replacement binds it.
    ipc_server::wake(&socket_path);
    let _ = ipc_handle.join();
    let _ = std::fs::remove_file(&pid_path);

    if teardown {
        match manager.lock() {
            Ok(mut mgr) => {
                if let Err(e) = mgr.on_host_teardown() {
                    tracing::error!(error = %e, "Relaunch request failed");
                }
            }
            Err(e) => tracing::error!(error = %e, "Manager lock poisoned during teardown"),
        }
    }

    // Connection threads may still hold a clone for a moment; the runtime is
    // joined by whoever drops the last reference.
    match Arc::try_unwrap(manager) {
        Ok(mutex) => mutex
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .shutdown(),
        Err(shared) => {
            tracing::warn!("Manager still referenced, stopping scheduler in place");
            if let Ok(mut mgr) = shared.lock() {
                let _ = mgr.on_stop();
            }
        }
    }

    tracing::info!("Daemon shutdown complete");
}
