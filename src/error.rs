//! Error types for the edgequake-doc2json library.
//!
//! Two distinct error types reflect two distinct failure scopes:
//!
//! * [`Doc2JsonError`] — **Request / document level**: a submission was
//!   rejected (bad extension, oversized upload, storage failure), a lookup
//!   referenced an unknown job, or a whole document could not be rendered.
//!   Render failures are recorded on the job and never thrown across the
//!   background boundary.
//!
//! * [`PageError`] — **Page level**: one page's model call or response parse
//!   failed. Stored as plain text inside [`crate::output::PageResult`] so the
//!   other pages of the same document are unaffected.

use crate::jobs::{JobId, JobStatus};
use std::path::PathBuf;
use thiserror::Error;

/// All document- and request-level errors returned by edgequake-doc2json.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Doc2JsonError {
    // ── Validation errors (submission rejected, no job created) ───────────
    /// The upload's extension is not in the configured allow-list.
    #[error("Unsupported file type '{extension}'. Allowed: {allowed}")]
    UnsupportedExtension { extension: String, allowed: String },

    /// The upload is larger than the configured maximum.
    #[error("File too large: {size} bytes exceeds maximum of {max_mb}MB")]
    FileTooLarge { size: u64, max_mb: u64 },

    /// The upload carried no bytes.
    #[error("Uploaded file '{filename}' is empty")]
    EmptyUpload { filename: String },

    // ── Storage errors (submission rejected, no job created) ──────────────
    /// The upload could not be written to the job's storage directory.
    #[error("Failed to store upload at '{path}': {source}")]
    StorageFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Render errors (recorded as a job failure) ─────────────────────────
    /// The document could not be turned into page images.
    #[error("Failed to render '{path}': {detail}")]
    RenderFailed { path: PathBuf, detail: String },

    /// The renderer does not know how to handle this document type.
    #[error("Unsupported document type '{extension}' for '{path}'")]
    UnsupportedDocument { path: PathBuf, extension: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Job lookup errors ─────────────────────────────────────────────────
    /// No job is registered under this id.
    #[error("Job {0} not found")]
    JobNotFound(JobId),

    /// Results were requested while the job is still processing.
    #[error("Job {0} is still processing")]
    JobNotReady(JobId),

    /// Results were requested for a job that failed.
    #[error("Job {job_id} failed: {error}")]
    JobFailed { job_id: JobId, error: String },

    /// A terminal transition was attempted on a job that already left
    /// `processing`.
    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    // ── Input errors (CLI) ────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    // ── LLM / config errors ───────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a background task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Doc2JsonError {
    /// `true` for errors that reject a submission before any job exists.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Doc2JsonError::UnsupportedExtension { .. }
                | Doc2JsonError::FileTooLarge { .. }
                | Doc2JsonError::EmptyUpload { .. }
        )
    }
}

/// A non-fatal error for a single page.
///
/// Converted to its display text and stored in
/// [`crate::output::PageOutcome::Error`]; sibling pages continue.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The model answered, but not with parseable JSON.
    ///
    /// `excerpt` holds a bounded prefix of the offending text for
    /// diagnostics; the full payload is never kept.
    #[error("Invalid JSON response from model: {detail}")]
    InvalidModelResponse { detail: String, excerpt: String },

    /// The model call itself failed (network, auth, provider error).
    #[error("Model call failed: {detail}")]
    ModelCallFailed { detail: String },

    /// The rendered page image could not be read or encoded.
    #[error("Page image '{path}' is unreadable: {detail}")]
    ImageUnreadable { path: PathBuf, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        let e = Doc2JsonError::UnsupportedExtension {
            extension: ".exe".into(),
            allowed: "pdf,png".into(),
        };
        assert!(e.is_validation());
        assert!(e.to_string().contains(".exe"));

        let e = Doc2JsonError::FileTooLarge {
            size: 60 * 1024 * 1024,
            max_mb: 50,
        };
        assert!(e.is_validation());
        assert!(e.to_string().contains("50MB"));

        let e = Doc2JsonError::JobNotFound(JobId::new());
        assert!(!e.is_validation());
    }

    #[test]
    fn invalid_transition_display() {
        let id = JobId::new();
        let e = Doc2JsonError::InvalidTransition {
            job_id: id,
            from: JobStatus::Completed,
            to: JobStatus::Failed,
        };
        let msg = e.to_string();
        assert!(msg.contains("completed"), "got: {msg}");
        assert!(msg.contains("failed"), "got: {msg}");
        assert!(msg.contains(&id.to_string()));
    }

    #[test]
    fn invalid_response_display_omits_excerpt() {
        let e = PageError::InvalidModelResponse {
            detail: "expected value at line 1 column 1".into(),
            excerpt: "not json at all".into(),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("Invalid JSON response from model"));
        assert!(!msg.contains("not json at all"));
    }
}
