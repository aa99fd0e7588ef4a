use std::time::Duration;
use thiserror::Error;

/// Transport-level failures talking to the inference backend.
/// Malformed backend output is NOT an error; it yields zero facts.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("inference transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("inference backend returned {0}")]
    Backend(reqwest::StatusCode),
}

/// Failure of a single store write. Logged and reported, never propagated
/// into the conversational turn.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("semantic store transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("semantic store returned status {0}")]
    Status(u16),

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("configuration: {0}")]
pub struct ConfigError(#[from] figment::Error);
