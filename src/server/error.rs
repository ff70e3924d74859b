//! HTTP error type.
//!
//! Every handler returns `Result<T, ServerError>`; [`IntoResponse`] turns it
//! into `{"error": "<message>"}` with a matching status code. Internal
//! errors are logged in full and answered with a generic message so paths
//! and provider details never reach clients.

use crate::error::Doc2JsonError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Rejected upload or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Unknown job id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Results requested while the job is still processing.
    #[error("not ready: {0}")]
    NotReady(String),

    /// Results requested for a failed job; carries the stored error.
    #[error("job failed: {0}")]
    JobFailed(String),

    /// The upload could not be written to disk.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<Doc2JsonError> for ServerError {
    fn from(e: Doc2JsonError) -> Self {
        match e {
            e if e.is_validation() => ServerError::BadRequest(e.to_string()),
            Doc2JsonError::JobNotFound(_) => ServerError::NotFound("Job not found".into()),
            Doc2JsonError::JobNotReady(_) => {
                ServerError::NotReady("Analysis still in progress".into())
            }
            Doc2JsonError::JobFailed { error, .. } => ServerError::JobFailed(error),
            e @ Doc2JsonError::StorageFailed { .. } => ServerError::Storage(e.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ServerError::NotReady(m) => (StatusCode::ACCEPTED, m),
            ServerError::JobFailed(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
            ServerError::Storage(m) => {
                error!(message = %m, "failed to store upload");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error saving file".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}
