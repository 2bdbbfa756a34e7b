use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProactiveError {
    /// Persisted record could not be written or replaced.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local socket round-trip with the daemon failed.
    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProactiveResult<T> = Result<T, ProactiveError>;
