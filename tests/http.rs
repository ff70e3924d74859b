//! HTTP API tests: requests go through the full router via `oneshot`.

#![cfg(feature = "server")]

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use common::{service_with, FakeRenderer, ScriptedClient};
use edgequake_doc2json::server::{router, AppState};
use edgequake_doc2json::{ModelClient, PageRenderer};
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower::ServiceExt;

const BOUNDARY: &str = "doc2json-test-boundary";

fn app(dir: &Path, renderer: Arc<dyn PageRenderer>, client: Arc<dyn ModelClient>) -> Router {
    router(Arc::new(AppState::new(service_with(dir, renderer, client))))
}

fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/analyze")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, filename, bytes)))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn upload(app: &Router, filename: &str) -> String {
    let (status, body) = send(app, upload_request("file", filename, b"%PDF-1.4")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["job_id"].as_str().unwrap().to_string()
}

async fn wait_status(app: &Router, job_id: &str, want: &str) -> Value {
    for _ in 0..500 {
        let (_, body) = get(app, &format!("/api/status/{job_id}")).await;
        if body["status"] == want {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached {want}");
}

#[tokio::test]
async fn root_and_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), FakeRenderer::pages(1), ScriptedClient::ok());

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["name"], "edgequake-doc2json");

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "scripted-vision");
    assert_eq!(body["jobs"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn upload_poll_and_fetch_results() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), FakeRenderer::pages(3), ScriptedClient::garbling(&[2]));

    let (status, body) = send(&app, upload_request("file", "letter.pdf", b"%PDF-1.4")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processing");
    assert_eq!(body["message"], "Document analysis started");
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let view = wait_status(&app, &job_id, "completed").await;
    assert_eq!(view["filename"], "letter.pdf");
    assert_eq!(view["page_count"], 3);

    let (status, body) = get(&app, &format!("/api/results/{job_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page_count"], 3);
    let pages = body["results"].as_array().unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0]["page_number"], 1);
    assert_eq!(pages[0]["total_pages"], 3);
    assert_eq!(
        pages[0]["data"]["document_classification"]["type"],
        "official_letter"
    );
    assert!(pages[1]["data"].is_null());
    assert!(pages[1]["error"].as_str().unwrap().contains("Invalid JSON"));
}

#[tokio::test]
async fn results_before_completion_are_accepted_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let app = app(
        dir.path(),
        FakeRenderer::pages(1),
        ScriptedClient::gated(Arc::clone(&gate)),
    );

    let job_id = upload(&app, "memo.png").await;
    let (status, body) = get(&app, &format!("/api/results/{job_id}")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["error"], "Analysis still in progress");

    let (status, body) = get(&app, &format!("/api/status/{job_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processing");

    gate.add_permits(1);
    wait_status(&app, &job_id, "completed").await;
}

#[tokio::test]
async fn failed_job_results_carry_the_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(
        dir.path(),
        FakeRenderer::failing("password required"),
        ScriptedClient::ok(),
    );

    let job_id = upload(&app, "locked.pdf").await;
    let view = wait_status(&app, &job_id, "failed").await;
    assert!(view["error"].as_str().unwrap().contains("password required"));

    let (status, body) = get(&app, &format!("/api/results/{job_id}")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("password required"));
}

#[tokio::test]
async fn rejected_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), FakeRenderer::pages(1), ScriptedClient::ok());

    let (status, body) = send(&app, upload_request("file", "notes.txt", b"hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains(".txt"));

    let (status, body) = send(&app, upload_request("attachment", "a.pdf", b"%PDF")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");

    let oversized = vec![b'x'; 1024 * 1024 + 1];
    let (status, body) = send(&app, upload_request("file", "big.pdf", &oversized)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("too large"));

    let (_, body) = get(&app, "/api/jobs").await;
    assert_eq!(body["jobs"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), FakeRenderer::pages(1), ScriptedClient::ok());

    let unknown = "5f0c2b1e-8a43-4c55-9d7e-2a6b3c4d5e6f";
    for uri in [
        format!("/api/status/{unknown}"),
        format!("/api/results/{unknown}"),
        "/api/status/not-a-job".to_string(),
    ] {
        let (status, body) = get(&app, &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["error"], "Job not found");
    }
}

#[tokio::test]
async fn delete_then_list() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), FakeRenderer::pages(1), ScriptedClient::ok());

    let keep = upload(&app, "keep.pdf").await;
    let gone = upload(&app, "drop.pdf").await;
    wait_status(&app, &keep, "completed").await;
    wait_status(&app, &gone, "completed").await;

    let delete = |id: &str| {
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/jobs/{id}"))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(&app, delete(&gone)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deleted");
    assert_eq!(body["job_id"], gone.as_str());

    let (status, _) = send(&app, delete(&gone)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&app, &format!("/api/status/{gone}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/api/jobs").await;
    assert_eq!(status, StatusCode::OK);
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["job_id"], keep.as_str());
    assert_eq!(jobs[0]["status"], "completed");
}
