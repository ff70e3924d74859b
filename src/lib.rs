//! # edgequake-doc2json
//!
//! Turn scanned documents into structured JSON records with Vision Language
//! Models (VLMs).
//!
//! A document (PDF or a single JPEG/PNG page) is uploaded, each page is
//! rendered to a preprocessed greyscale image, each image is sent to a remote
//! vision model with a fixed extraction prompt, and the model's JSON replies
//! are collected per page. Analysis runs in the background; callers poll a
//! job until it is `completed` or `failed`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Submit    validate extension/size, persist, register job (processing)
//!  ├─ 2. Queue     background worker picks the job up
//!  ├─ 3. Render    pdfium / image → page_NNN.jpg (spawn_blocking)
//!  ├─ 4. Analyze   one VLM call per page, strip fences, parse JSON
//!  ├─ 5. Aggregate page-ordered results, failures isolated per page
//!  └─ 6. Record    exactly one terminal write: completed | failed
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2json::{AnalyzerConfig, DocumentService, JobStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let service = DocumentService::from_config(AnalyzerConfig::default())?;
//!     let bytes = std::fs::read("letter.pdf")?;
//!     let submission = service.submit("letter.pdf", &bytes).await?;
//!
//!     while service.status(submission.job_id)?.status == JobStatus::Processing {
//!         tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!     }
//!     let results = service.results(submission.job_id)?;
//!     println!("{}", serde_json::to_string_pretty(&results)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | The `doc2json` binary (clap, anyhow, tracing-subscriber, indicatif) |
//! | `server` | on      | The axum HTTP API in [`server`] |
//!
//! ```toml
//! edgequake-doc2json = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod jobs;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;
#[cfg(feature = "server")]
pub mod server;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, DEFAULT_MODEL};
pub use error::{Doc2JsonError, PageError};
pub use jobs::{Job, JobId, JobRegistry, JobStatus, JobSummary};
pub use output::{JobResults, JobStatusView, PageOutcome, PageResult};
pub use pipeline::aggregate::DocumentAggregator;
pub use pipeline::analyze::{parse_model_response, PageAnalyzer};
pub use pipeline::llm::{LlmModelClient, ModelClient};
pub use pipeline::render::{PageRenderer, PdfiumRenderer, RenderSettings};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback, TracingProgress};
pub use schema::ExtractionRecord;
pub use service::{analyze_file, analyze_file_with, DocumentService, Submission};
