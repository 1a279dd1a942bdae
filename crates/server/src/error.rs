// crates/server/src/error.rs
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use datajobs_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Seconds a client should wait before retrying after a lock timeout.
const RETRY_AFTER_SECS: &str = "1";

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Store(store_err) => match store_err {
                StoreError::JobNotFound(id) => {
                    tracing::info!(job_id = %id, "Job not found");
                    (
                        StatusCode::NOT_FOUND,
                        ErrorResponse::with_details("Job not found", format!("Job ID: {}", id)),
                    )
                }
                StoreError::DuplicateJob(id) => {
                    tracing::warn!(job_id = %id, "Duplicate job");
                    (
                        StatusCode::CONFLICT,
                        ErrorResponse::with_details("Job already exists", format!("Job ID: {}", id)),
                    )
                }
                StoreError::InvalidTransition { .. } => {
                    tracing::warn!(error = %store_err, "Invalid status transition");
                    (
                        StatusCode::CONFLICT,
                        ErrorResponse::with_details("Invalid status transition", store_err.to_string()),
                    )
                }
                StoreError::LockTimeout(timeout) => {
                    tracing::warn!(error = %timeout, "Job store busy");
                    let body = ErrorResponse::with_details("Job store busy, retry later", timeout.to_string());
                    return (
                        StatusCode::SERVICE_UNAVAILABLE,
                        [(header::RETRY_AFTER, RETRY_AFTER_SECS)],
                        Json(body),
                    )
                        .into_response();
                }
                StoreError::StatusIndexCorrupt { id, status } => {
                    tracing::error!(job_id = %id, status = %status, "Job store index corrupt");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::new("Internal server error"),
                    )
                }
            },
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
