//! Error taxonomy for the benchmark engine.
//!
//! Four failure classes cross the engine's boundaries: bad configuration,
//! failed result verification, adapter/transport faults, and malformed result
//! logs. Adapter faults are always propagated — the engine never retries.

use thiserror::Error;

pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid or missing configuration property, reported with key and value.
    #[error("config error: {0}")]
    Config(String),

    /// An operation's observed result did not match the expected value.
    #[error("verification failed: {0}")]
    Verification(String),

    /// Failure from the underlying connection or operation call.
    #[error("adapter error: {0}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),

    /// Malformed result-log line, annotated with file and 1-based line number.
    #[error("{path}:{line}: {msg}")]
    Parse {
        path: String,
        line: usize,
        msg: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Adapter error from a plain message (backends without a typed error).
    pub fn adapter(msg: impl Into<String>) -> Self {
        BenchError::Adapter(msg.into().into())
    }
}

impl From<rusqlite::Error> for BenchError {
    fn from(e: rusqlite::Error) -> Self {
        BenchError::Adapter(Box::new(e))
    }
}
