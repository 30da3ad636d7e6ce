// File: src/error.rs
use thiserror::Error;

/// Errors raised by the oracle library.
///
/// Most of these never cross a tick boundary: the orchestrator recovers them
/// per letter, per strand, per word or per cycle and only logs them.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("bit source is empty")]
    EmptyBitSource,

    #[error("letter pool is empty")]
    EmptyLetterPool,

    #[error("dictionary is empty")]
    DictionaryEmpty,

    #[error("invalid word: {0:?}")]
    InvalidWord(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cycle #{0} is still in flight")]
    CycleInFlight(u64),

    #[error("streaming is stopped")]
    Stopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, OracleError>;
