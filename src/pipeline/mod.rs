//! Pipeline stages for document analysis.
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ analyze ──▶ aggregate
//! (path/URL) (pdfium)  (base64)  (VLM)   (parse)     (per page)
//! ```
//!
//! 1. [`input`]     — CLI only: resolve a path or URL to a local file
//! 2. [`render`]    — rasterise and preprocess pages to `page_NNN.jpg`;
//!    blocking, so async callers use [`render::render_document`]
//! 3. [`encode`]    — base64-wrap a page image for the request body
//! 4. [`llm`]       — one model call per page behind [`llm::ModelClient`]
//! 5. [`analyze`]   — strip code fences and parse the reply into a record
//! 6. [`aggregate`] — run every page, isolating failures, in page order
//!
//! [`DocumentPipeline`] chains render and aggregate for the job queue and
//! the CLI.

pub mod aggregate;
pub mod analyze;
pub mod encode;
pub mod input;
pub mod llm;
pub mod render;

use crate::error::Doc2JsonError;
use crate::jobs::{JobId, JobProcessor};
use crate::output::PageResult;
use aggregate::DocumentAggregator;
use async_trait::async_trait;
use render::{render_document, PageRenderer};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Render a document, then analyse its pages.
#[derive(Clone)]
pub struct DocumentPipeline {
    renderer: Arc<dyn PageRenderer>,
    aggregator: DocumentAggregator,
}

impl DocumentPipeline {
    pub fn new(renderer: Arc<dyn PageRenderer>, aggregator: DocumentAggregator) -> Self {
        Self {
            renderer,
            aggregator,
        }
    }

    pub fn aggregator(&self) -> &DocumentAggregator {
        &self.aggregator
    }

    /// A render failure fails the whole document; page failures do not.
    pub async fn run(
        &self,
        document: &Path,
        pages_dir: &Path,
    ) -> Result<Vec<PageResult>, Doc2JsonError> {
        let pages = render_document(Arc::clone(&self.renderer), document, pages_dir).await?;
        Ok(self.aggregator.aggregate(&pages).await)
    }
}

#[async_trait]
impl JobProcessor for DocumentPipeline {
    async fn process(
        &self,
        job_id: JobId,
        document: &Path,
        pages_dir: &Path,
    ) -> Result<Vec<PageResult>, Doc2JsonError> {
        let results = self.run(document, pages_dir).await?;
        info!(
            job_id = %job_id,
            pages = results.len(),
            failed = results.iter().filter(|r| r.outcome.is_error()).count(),
            "pipeline finished"
        );
        Ok(results)
    }
}
