//! Proactive Daemon: background proactive-engagement scheduler.
//!
//! Periodically decides whether to contact a chat-completion endpoint, fetches
//! a short message, surfaces it to the user, and keeps a bounded backlog of
//! generated messages for the host to consume. At most one fetch is ever in
//! flight; failures fall back to pre-written lines and never stop the loop.

pub mod config;
pub mod constants;
pub mod error;
pub mod fetcher;
pub mod ipc_client;
pub mod message;
pub mod notification;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod tracing_init;

#[cfg(test)]
pub mod test_helpers;

pub use error::{ProactiveError, ProactiveResult};
