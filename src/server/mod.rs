//! HTTP API over [`DocumentService`] (feature `server`).
//!
//! [`router`] assembles the axum application: routes, a body limit sized to
//! the configured maximum upload, request tracing and permissive CORS.
//! [`serve`] runs it until SIGINT/SIGTERM and then drains the job queue.

pub mod error;
pub mod routes;

pub use error::ServerError;

use crate::service::DocumentService;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Multipart framing on top of the file itself.
const MULTIPART_SLACK_BYTES: usize = 1024 * 1024;

/// Shared handler state.
#[derive(Debug)]
pub struct AppState {
    pub service: DocumentService,
}

impl AppState {
    pub fn new(service: DocumentService) -> Self {
        Self { service }
    }
}

/// Build the complete router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.service.config().max_file_size_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_SLACK_BYTES);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/api/analyze", post(routes::analyze))
        .route("/api/status/{job_id}", get(routes::status))
        .route("/api/results/{job_id}", get(routes::results))
        .route("/api/jobs/{job_id}", delete(routes::delete_job))
        .route("/api/jobs", get(routes::list_jobs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until a shutdown signal, then wait for queued jobs.
pub async fn serve(addr: SocketAddr, service: DocumentService) -> std::io::Result<()> {
    let state = Arc::new(AppState::new(service));
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match Arc::try_unwrap(state) {
        Ok(state) => {
            info!("draining job queue");
            state.service.shutdown().await;
        }
        Err(_) => warn!("handlers still hold the service; skipping queue drain"),
    }
    info!("server stopped");
    Ok(())
}

/// Resolves on SIGINT (Ctrl-C) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
