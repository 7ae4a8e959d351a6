//! Error types for the notes server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error Enum ==
/// A note store failed to execute an operation.
///
/// Absence of a note is never a `StoreError`; lookups return `Option`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The SQLite backend rejected or failed the statement
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be decoded into a note
    #[error("Corrupt note record: {0}")]
    Corrupt(String),
}

// == Purger Error Enum ==
/// Lifecycle misuse of a purger.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PurgerError {
    /// `start` was called on a purger that already left the idle state
    #[error("Purger '{0}' was already started or stopped")]
    AlreadyStarted(String),

    /// The configured sweep period is zero
    #[error("Purger '{0}' needs a non-zero period")]
    InvalidPeriod(String),
}

// == API Error Enum ==
/// Unified error type for the HTTP layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No note with the requested id
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Capability check failed
    #[error("Unauthorized")]
    Unauthorized,

    /// The client has no token left in its bucket
    #[error("Too many requests")]
    RateLimited,

    /// The backing store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let ApiError::Store(err) = &self {
            tracing::error!("Store failure: {}", err);
        }

        let body = Json(ErrorResponse::new(self.to_string()));

        if matches!(self, ApiError::Unauthorized) {
            return (
                status,
                [(header::WWW_AUTHENTICATE, r#"Bearer realm="notes""#)],
                body,
            )
                .into_response();
        }

        (status, body).into_response()
    }
}

// == Result Type Aliases ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Convenience Result type for note store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
