use std::io;

/// Errors from world-state operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the commit log or data directory.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization failure of a commit-log entry.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The transaction was aborted; no further calls are accepted.
    #[error("transaction aborted")]
    Aborted,

    /// The transaction has already been committed.
    #[error("transaction already committed")]
    Closed,

    /// A lock guarding shared state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// A range scan was requested with `start > end`.
    #[error("invalid range: start {start:?} is after end {end:?}")]
    InvalidRange { start: String, end: String },
}

/// Result alias for world-state operations.
pub type StoreResult<T> = Result<T, StoreError>;
