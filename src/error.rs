//! Error types for the cache service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Source Error Enum ==
/// Failure reported by a remote data source.
///
/// The cache never wraps or reclassifies these; they reach the caller as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The remote service could not be reached or timed out
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The requested row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote service refused the write or query
    #[error("Rejected: {0}")]
    Rejected(String),
}

// == App Error Enum ==
/// Unified error type for the HTTP layer.
#[derive(Error, Debug)]
pub enum AppError {
    /// Key or row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error surfaced by the remote data source
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Source(SourceError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Source(SourceError::Rejected(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Source(SourceError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Aliases ==
/// Convenience Result type for the HTTP layer.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type returned by data sources and the cached services over them.
pub type SourceResult<T> = std::result::Result<T, SourceError>;
