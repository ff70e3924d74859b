//! Route handlers.
//!
//! | Method | Path                    | Handler        |
//! |--------|-------------------------|----------------|
//! | GET    | `/`                     | [`root`]       |
//! | GET    | `/health`               | [`health`]     |
//! | POST   | `/api/analyze`          | [`analyze`]    |
//! | GET    | `/api/status/{job_id}`  | [`status`]     |
//! | GET    | `/api/results/{job_id}` | [`results`]    |
//! | DELETE | `/api/jobs/{job_id}`    | [`delete_job`] |
//! | GET    | `/api/jobs`             | [`list_jobs`]  |

use super::error::ServerError;
use super::AppState;
use crate::error::Doc2JsonError;
use crate::jobs::JobId;
use crate::output::{JobResults, JobStatusView};
use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "edgequake-doc2json",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "model": state.service.model_name(),
        "jobs": state.service.registry().len(),
    }))
}

/// Accept a multipart upload (field `file`) and start background analysis.
///
/// The extension is checked as soon as the field header arrives and the
/// size while chunks stream in, so a rejected upload is never buffered in
/// full.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ServerError> {
    let service = &state.service;
    let max_bytes = service.config().max_file_size_bytes();
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        service.check_upload(&filename, 0)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Failed to read file chunk: {e}")))?
        {
            bytes.extend_from_slice(&chunk);
            if bytes.len() as u64 > max_bytes {
                return Err(Doc2JsonError::FileTooLarge {
                    size: bytes.len() as u64,
                    max_mb: service.config().max_file_size_mb,
                }
                .into());
            }
        }
        debug!(filename = %filename, size_bytes = bytes.len(), "received file upload");
        upload = Some((filename, bytes));
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ServerError::BadRequest("No file uploaded".into()))?;
    let submission = service.submit(&filename, &bytes).await?;

    Ok(Json(json!({
        "status": submission.status,
        "message": "Document analysis started",
        "job_id": submission.job_id,
    })))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusView>, ServerError> {
    let id = parse_job_id(&job_id)?;
    Ok(Json(state.service.status(id)?))
}

pub async fn results(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobResults>, ServerError> {
    let id = parse_job_id(&job_id)?;
    Ok(Json(state.service.results(id)?))
}

pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let id = parse_job_id(&job_id)?;
    state.service.delete(id).await?;
    Ok(Json(json!({ "status": "deleted", "job_id": id })))
}

pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "jobs": state.service.list() }))
}

/// Ids that are not UUIDs cannot name a job.
fn parse_job_id(raw: &str) -> Result<JobId, ServerError> {
    raw.parse()
        .map_err(|_| ServerError::NotFound("Job not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_reports_running() {
        let Json(body) = root().await;
        assert_eq!(body["status"], "running");
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }

    #[test]
    fn malformed_id_is_not_found() {
        assert!(matches!(
            parse_job_id("../../etc"),
            Err(ServerError::NotFound(_))
        ));
        let id = JobId::new();
        assert_eq!(parse_job_id(&id.to_string()).unwrap(), id);
    }
}
