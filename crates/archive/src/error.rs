//! Archive store error types.

use thiserror::Error;

/// Archive store operation errors.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive file not found: {0}")]
    NotFound(String),

    #[error("short read from {key}: expected {expected} bytes, got {actual}")]
    ShortRead {
        key: String,
        expected: u64,
        actual: u64,
    },

    #[error("archive server returned {status} for {key}")]
    Status { key: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for archive operations.
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;
