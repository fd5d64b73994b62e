//! Error types for isolator
//!
//! HTTP-visible errors implement `IntoResponse`; pipeline stage errors are
//! collected into `PipelineError` and only ever surface through the notifier.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::dropbox::PublishError;
use crate::services::fetcher::FetchError;
use crate::services::separator::SeparationError;

/// Errors the HTTP layer can observe. Everything after the fast-ack is a
/// `PipelineError` and never maps to an HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credential (401)
    #[error("unauthorized")]
    Unauthorized,

    /// Body that could not be parsed as an intake request (400)
    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "ok": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Fatal stage failures, caught exactly once at the pipeline controller
/// boundary and converted into a single failure notification.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("stem separation failed: {0}")]
    Separation(#[from] SeparationError),

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("scratch directory error: {0}")]
    Scratch(#[from] std::io::Error),
}
