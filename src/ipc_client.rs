//! Daemon IPC client: line-delimited JSON-RPC over a local socket.
//!
//! Used by the CLI (and any host process) to drive the running daemon.
//! Cross-platform via interprocess: Unix domain sockets / Windows named pipes.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::StartRequest;
use crate::constants::IPC_TIMEOUT_SECS;
use crate::message::PendingMessage;
use crate::storage::path_utils;
use crate::{ProactiveError, ProactiveResult};

#[derive(Debug, Serialize)]
struct IpcRequest<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct IpcResponse {
    result: Option<serde_json::Value>,
    error: Option<IpcError>,
}

#[derive(Debug, Deserialize)]
struct IpcError {
    #[allow(dead_code)]
    code: i64,
    message: String,
}

/// True if a daemon answers on the socket.
pub fn ping() -> bool {
    call_daemon("ping", serde_json::json!({}))
        .map(|v| v.get("pong").is_some())
        .unwrap_or(false)
}

pub fn start(request: &StartRequest) -> ProactiveResult<serde_json::Value> {
    call_daemon("start", serde_json::to_value(request)?)
}

pub fn stop() -> ProactiveResult<serde_json::Value> {
    call_daemon("stop", serde_json::json!({}))
}

pub fn set_proactive_mode(enabled: bool) -> ProactiveResult<serde_json::Value> {
    call_daemon("set_proactive_mode", serde_json::json!({ "enabled": enabled }))
}

pub fn is_running() -> ProactiveResult<bool> {
    let v = call_daemon("is_running", serde_json::json!({}))?;
    Ok(v.get("running").and_then(|r| r.as_bool()).unwrap_or(false))
}

pub fn status() -> ProactiveResult<serde_json::Value> {
    call_daemon("status", serde_json::json!({}))
}

pub fn pending() -> ProactiveResult<Vec<PendingMessage>> {
    let v = call_daemon("pending", serde_json::json!({}))?;
    let messages = v.get("messages").cloned().unwrap_or(serde_json::json!([]));
    Ok(serde_json::from_value(messages)?)
}

pub fn shutdown() -> ProactiveResult<serde_json::Value> {
    call_daemon("shutdown", serde_json::json!({}))
}

/// Simulate the host tearing the daemon down: it stops and relaunches itself.
pub fn teardown() -> ProactiveResult<serde_json::Value> {
    call_daemon("teardown", serde_json::json!({}))
}

/// Generic method call, guarded by a timeout via thread + channel.
pub fn call_daemon(method: &str, params: serde_json::Value) -> ProactiveResult<serde_json::Value> {
    let sock_path = path_utils::socket_path();

    // Named pipes on Windows do not create files.
    #[cfg(unix)]
    if !sock_path.exists() {
        return Err(ProactiveError::Ipc(format!(
            "Daemon socket not found: {}. Is the daemon running?",
            sock_path.display()
        )));
    }

    let request = IpcRequest {
        jsonrpc: "2.0",
        method,
        params,
        id: 1,
    };
    let request_json = serde_json::to_string(&request)?;

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        tx.send(do_ipc_call(sock_path, request_json)).ok();
    });

    rx.recv_timeout(Duration::from_secs(IPC_TIMEOUT_SECS))
        .map_err(|_| ProactiveError::Ipc(format!("Daemon IPC timeout after {}s", IPC_TIMEOUT_SECS)))?
}

fn do_ipc_call(sock_path: PathBuf, request_json: String) -> ProactiveResult<serde_json::Value> {
    use interprocess::local_socket::{prelude::*, GenericFilePath};

    let name = sock_path
        .to_fs_name::<GenericFilePath>()
        .map_err(|e| ProactiveError::Ipc(format!("Invalid socket name: {}", e)))?;

    let mut stream = interprocess::local_socket::Stream::connect(name)
        .map_err(|e| ProactiveError::Ipc(format!("Failed to connect to daemon: {}", e)))?;

    stream
        .write_all(request_json.as_bytes())
        .and_then(|_| stream.write_all(b"\n"))
        .and_then(|_| stream.flush())
        .map_err(|e| ProactiveError::Ipc(format!("Failed to write to daemon: {}", e)))?;

    let mut reader = BufReader::new(&mut stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| ProactiveError::Ipc(format!("Failed to read daemon response: {}", e)))?;

    let response: IpcResponse = serde_json::from_str(&response_line)
        .map_err(|e| ProactiveError::Ipc(format!("Invalid daemon response: {}", e)))?;

    if let Some(err) = response.error {
        return Err(ProactiveError::Ipc(format!("Daemon error: {}", err.message)));
    }

    Ok(response
        .result
        .unwrap_or(serde_json::Value::Object(Default::default())))
}
