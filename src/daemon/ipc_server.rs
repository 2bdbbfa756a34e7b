//! IPC Server: cross-platform local socket, line-delimited JSON-RPC protocol.
//!
//! Uses `interprocess` crate for cross-platform IPC:
//!   - Unix/macOS: Unix domain sockets
//!   - Windows: Named pipes
//!
//! Protocol: JSON-RPC 2.0 over local socket (matches ipc_client.rs).
//! Each message is a single JSON line terminated by \n.
//!
//! Methods:
//!   ping               → {"pong": true}
//!   start              → merge StartRequest params, (re)arm the scheduler
//!   stop               → stop scheduling
//!   set_proactive_mode → {"enabled": bool}, persisted then applied
//!   is_running         → {"running": bool}
//!   status             → service + scheduler snapshot
//!   pending            → pending message backlog
//!   shutdown           → initiate graceful shutdown
//!   teardown           → stop, then request a relaunch from the host

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use proactive_daemon::config::StartRequest;

use super::SharedManager;

/// JSON-RPC response sent back to clients.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: u64,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Daemon-level flags the IPC methods can flip.
struct Control {
    running: Arc<AtomicBool>,
    teardown: Arc<AtomicBool>,
    start_time: Instant,
}

/// Run the IPC listener. Each incoming connection gets its own thread.
pub fn run(
    socket_path: &Path,
    manager: SharedManager,
    running: Arc<AtomicBool>,
    teardown: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    use interprocess::local_socket::{prelude::*, GenericFilePath, ListenerOptions};

    // Remove stale socket file (harmless on Windows)
    let _ = std::fs::remove_file(socket_path);

    let listener = ListenerOptions::new()
        .name(socket_path.to_fs_name::<GenericFilePath>()?)
        .create_sync()?;

    tracing::info!("IPC listening on {:?}", socket_path);

    let control = Arc::new(Control {
        running: running.clone(),
        teardown,
        start_time: Instant::now(),
    });

    while running.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok(stream) => {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                let manager = manager.clone();
                let control = control.clone();
                std::thread::spawn(move || {
                    handle_connection(stream, &manager, &control);
                });
            }
            Err(e) => {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                tracing::warn!("Accept error: {}", e);
                std::thread::sleep(Duration::from_millis(100));
            }
        }
    }

    let _ = std::fs::remove_file(socket_path);
    tracing::info!("IPC server stopped");
    Ok(())
}

/// Wake the listener by connecting to it (for clean shutdown).
pub fn wake(socket_path: &Path) {
    use interprocess::local_socket::{prelude::*, GenericFilePath};

    if let Ok(name) = socket_path.to_fs_name::<GenericFilePath>() {
        let _ = interprocess::local_socket::Stream::connect(name);
    }
}

fn handle_connection(
    stream: interprocess::local_socket::Stream,
    manager: &SharedManager,
    control: &Control,
) {
    let mut stream = stream;
    let mut line = String::new();
    {
        let mut reader = BufReader::new(&mut stream);
        if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
            return;
        }
    }

    let data: serde_json::Value = match serde_json::from_str(&line) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "IPC: invalid JSON received");
            return;
        }
    };

    let method = data.get("method").and_then(|v| v.as_str()).unwrap_or("");
    let params = data
        .get("params")
        .cloned()
        .unwrap_or(serde_json::json!({}));
    let id = data.get("id").and_then(|v| v.as_u64()).unwrap_or(0);

    let request_start = Instant::now();
    tracing::debug!(method = method, id = id, "IPC request received");

    let result = dispatch(method, &params, manager, control);

    tracing::debug!(
        method = method,
        ok = result.is_ok(),
        duration_ms = request_start.elapsed().as_millis() as u64,
        "IPC request completed"
    );

    let response = match result {
        Ok(r) => JsonRpcResponse {
            jsonrpc: "2.0",
            result: Some(r),
            error: None,
            id,
        },
        Err(msg) => JsonRpcResponse {
            jsonrpc: "2.0",
            result: None,
            error: Some(JsonRpcError {
                code: -1,
                message: msg,
            }),
            id,
        },
    };

    if let Ok(json) = serde_json::to_string(&response) {
        let _ = stream.write_all(json.as_bytes());
        let _ = stream.write_all(b"\n");
        let _ = stream.flush();
    }
}

fn dispatch(
    method: &str,
    params: &serde_json::Value,
    manager: &SharedManager,
    control: &Control,
) -> Result<serde_json::Value, String> {
    match method {
        "ping" => Ok(serde_json::json!({"pong": true})),

        "shutdown" => {
            tracing::info!("Shutdown requested via IPC");
            control.running.store(false, Ordering::Relaxed);
            Ok(serde_json::json!({"shutting_down": true}))
        }

        "teardown" => {
            tracing::info!("Host teardown requested via IPC");
            control.teardown.store(true, Ordering::Relaxed);
            Ok(serde_json::json!({"relaunching": true}))
        }

        "start" => {
            let request: StartRequest = serde_json::from_value(params.clone())
                .map_err(|e| format!("Invalid start params: {}", e))?;
            let mut mgr = manager.lock().map_err(|e| e.to_string())?;
            mgr.on_start(request).map_err(|e| e.to_string())?;
            Ok(serde_json::json!({"running": mgr.is_running()}))
        }

        "stop" => {
            let mut mgr = manager.lock().map_err(|e| e.to_string())?;
            mgr.on_stop().map_err(|e| e.to_string())?;
            Ok(serde_json::json!({"running": false}))
        }

        "set_proactive_mode" => {
            let enabled = params
                .get("enabled")
                .and_then(|v| v.as_bool())
                .ok_or_else(|| "Missing boolean 'enabled' in params".to_string())?;
            let mut mgr = manager.lock().map_err(|e| e.to_string())?;
            mgr.set_proactive_mode(enabled).map_err(|e| e.to_string())?;
            Ok(serde_json::json!({
                "proactive_enabled": enabled,
                "running": mgr.is_running(),
            }))
        }

        "is_running" => {
            let mgr = manager.lock().map_err(|e| e.to_string())?;
            Ok(serde_json::json!({"running": mgr.is_running()}))
        }

        "status" => {
            let mgr = manager.lock().map_err(|e| e.to_string())?;
            let mut status = serde_json::to_value(mgr.status()).map_err(|e| e.to_string())?;
            if let Some(obj) = status.as_object_mut() {
                obj.insert("pid".into(), serde_json::json!(std::process::id()));
                obj.insert(
                    "uptime_secs".into(),
                    serde_json::json!(control.start_time.elapsed().as_secs()),
                );
            }
            Ok(status)
        }

        "pending" => {
            let mgr = manager.lock().map_err(|e| e.to_string())?;
            let messages = mgr.pending_messages();
            Ok(serde_json::json!({
                "count": messages.len(),
                "messages": messages,
            }))
        }

        _ => Err(format!("Unknown method: {}", method)),
    }
}
