//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid probe_asn: {0}")]
    InvalidProbeAsn(String),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("invalid order_by: {0}")]
    InvalidOrderBy(String),

    #[error("invalid {field}: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("invalid {field} filter: {value}")]
    InvalidBooleanFilter { field: &'static str, value: String },

    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("frame decode error: {0}")]
    FrameDecode(String),

    #[error("record [{offset}, {offset}+{size}) out of bounds for {available} byte frame")]
    RecordOutOfBounds {
        offset: i64,
        size: i64,
        available: usize,
    },

    #[error("invalid certificate bundle: {0}")]
    InvalidCertBundle(String),
}

impl Error {
    /// Whether the error was caused by caller-supplied input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidProbeAsn(_)
                | Self::InvalidOrder(_)
                | Self::InvalidOrderBy(_)
                | Self::InvalidTimestamp { .. }
                | Self::InvalidBooleanFilter { .. }
                | Self::InvalidPagination(_)
        )
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
