//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// A collaborator (archive server, VPN provider) failed or misbehaved.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Stored coordinates or archive bytes do not describe a valid record.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] msmt_metadata::MetadataError),

    #[error("archive error: {0}")]
    Archive(#[from] msmt_archive::ArchiveError),

    #[error("{0}")]
    Core(#[from] msmt_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Upstream(_) => "upstream_error",
            Self::DataCorruption(_) => "data_corruption",
            Self::Internal(_) => "internal_error",
            Self::Metadata(e) => match e {
                msmt_metadata::MetadataError::NotFound(_) => "not_found",
                _ => "metadata_error",
            },
            Self::Archive(_) => "upstream_error",
            Self::Core(e) => match e {
                e if e.is_client_error() => "bad_request",
                msmt_core::Error::InvalidCertBundle(_) => "upstream_error",
                _ => "data_corruption",
            },
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::DataCorruption(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(e) => match e {
                msmt_metadata::MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Archive(_) => StatusCode::BAD_GATEWAY,
            Self::Core(e) => match e {
                e if e.is_client_error() => StatusCode::BAD_REQUEST,
                msmt_core::Error::InvalidCertBundle(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
