//! Progress callbacks for per-page analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`]. The CLI drives
//! a progress bar from these events; the server uses [`TracingProgress`].
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2json::{AnalysisProgressCallback, AnalyzerConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter(AtomicUsize);
//!
//! impl AnalysisProgressCallback for FailureCounter {
//!     fn on_page_error(&self, _page: usize, _total: usize, _error: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = AnalyzerConfig::builder()
//!     .progress_callback(Arc::new(FailureCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;
use tracing::{debug, info, warn};

/// Called by the document aggregator as it works through a document.
///
/// With `page_concurrency > 1` the page methods may be called concurrently,
/// so implementations must be `Send + Sync`. Every method defaults to a
/// no-op.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once before the first page is sent to the model.
    fn on_document_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the model request for a page.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page produced a record.
    fn on_page_complete(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page's model call or parse failed.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been attempted.
    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// Ignores every event.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Turns events into structured log lines.
pub struct TracingProgress;

impl AnalysisProgressCallback for TracingProgress {
    fn on_document_start(&self, total_pages: usize) {
        info!(total_pages, "analysing document");
    }

    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        debug!(page = page_num, total_pages, "page sent to model");
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        warn!(page = page_num, total_pages, %error, "page analysis failed");
    }

    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        info!(
            total_pages,
            success_count,
            failed = total_pages - success_count.min(total_pages),
            "document analysed"
        );
    }
}

/// The type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        successes: AtomicUsize,
    }

    impl AnalysisProgressCallback for Tracking {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _total_pages: usize, success_count: usize) {
            self.successes.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn defaults_are_noops() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_document_start(3);
        cb.on_page_start(1, 3);
        cb.on_page_complete(1, 3);
        cb.on_page_error(2, 3, "bad json");
        cb.on_document_complete(3, 2);

        let cb = TracingProgress;
        cb.on_document_start(1);
        cb.on_document_complete(1, 0);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let t = Tracking::default();
        t.on_document_start(2);
        t.on_page_start(1, 2);
        t.on_page_complete(1, 2);
        t.on_page_start(2, 2);
        t.on_page_error(2, 2, "Model call failed: timeout");
        t.on_document_complete(2, 1);

        assert_eq!(t.starts.load(Ordering::SeqCst), 2);
        assert_eq!(t.completes.load(Ordering::SeqCst), 1);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
        assert_eq!(t.successes.load(Ordering::SeqCst), 1);
    }
}
