//! The document service: submission, polling and deletion of jobs.
//!
//! ```text
//! submit ─▶ validate ─▶ persist upload ─▶ register job ─▶ enqueue ─▶ {job_id, processing}
//!                                                            │
//!                                  JobQueue worker ◀─────────┘
//!                                  render ─▶ aggregate ─▶ one terminal write
//! ```
//!
//! Validation and storage failures are returned synchronously and never
//! create a job. Everything after the enqueue happens in the background and
//! ends up recorded on the job.

use crate::config::AnalyzerConfig;
use crate::error::Doc2JsonError;
use crate::jobs::{JobId, JobQueue, JobRegistry, JobState, JobStatus, JobStorage, JobSummary};
use crate::output::{JobResults, JobStatusView, PageResult};
use crate::pipeline::aggregate::DocumentAggregator;
use crate::pipeline::analyze::PageAnalyzer;
use crate::pipeline::llm::{LlmModelClient, ModelClient};
use crate::pipeline::render::{PageRenderer, PdfiumRenderer};
use crate::pipeline::DocumentPipeline;
use crate::progress::{ProgressCallback, TracingProgress};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;

/// Returned by [`DocumentService::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub job_id: JobId,
    pub status: JobStatus,
}

pub struct DocumentService {
    config: AnalyzerConfig,
    registry: Arc<JobRegistry>,
    storage: JobStorage,
    queue: JobQueue,
    model: String,
}

impl std::fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentService")
            .field("model", &self.model)
            .field("upload_dir", &self.storage.root())
            .field("jobs", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl DocumentService {
    /// Assemble the service around an explicit renderer and model client.
    ///
    /// Spawns the queue dispatcher, so it must be called from within a tokio
    /// runtime.
    pub fn new(
        config: AnalyzerConfig,
        renderer: Arc<dyn PageRenderer>,
        client: Arc<dyn ModelClient>,
    ) -> Self {
        let storage = JobStorage::new(config.upload_dir.clone());
        let registry = Arc::new(JobRegistry::with_purger(Arc::new(storage.clone())));
        let model = client.model_name().to_string();

        let pipeline = DocumentPipeline::new(renderer, aggregator_for(&config, client));
        let queue = JobQueue::start(Arc::clone(&registry), Arc::new(pipeline), config.worker_count);

        info!(
            model = %model,
            upload_dir = %storage.root().display(),
            workers = config.worker_count,
            "document service ready"
        );
        Self {
            config,
            registry,
            storage,
            queue,
            model,
        }
    }

    /// pdfium renderer plus a provider resolved from config and environment.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, Doc2JsonError> {
        let renderer = Arc::new(PdfiumRenderer::from_config(&config));
        let client = Arc::new(LlmModelClient::from_config(&config)?);
        Ok(Self::new(config, renderer, client))
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Reject uploads by extension and size before any bytes are stored.
    pub fn check_upload(&self, filename: &str, size: u64) -> Result<(), Doc2JsonError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !self.config.is_allowed_extension(extension) {
            return Err(Doc2JsonError::UnsupportedExtension {
                extension: format!(".{}", extension.to_ascii_lowercase()),
                allowed: self.config.allowed_extensions_display(),
            });
        }
        if size > self.config.max_file_size_bytes() {
            return Err(Doc2JsonError::FileTooLarge {
                size,
                max_mb: self.config.max_file_size_mb,
            });
        }
        Ok(())
    }

    /// Accept a document for background analysis.
    ///
    /// Returns as soon as the job is queued; poll [`DocumentService::status`].
    pub async fn submit(&self, filename: &str, bytes: &[u8]) -> Result<Submission, Doc2JsonError> {
        self.check_upload(filename, bytes.len() as u64)?;
        if bytes.is_empty() {
            return Err(Doc2JsonError::EmptyUpload {
                filename: filename.to_string(),
            });
        }

        let job_id = JobId::new();
        let document = self.storage.persist_upload(job_id, filename, bytes).await?;
        self.registry.register(job_id, filename);
        self.queue
            .enqueue(job_id, document, self.storage.pages_dir(job_id))?;

        info!(job_id = %job_id, filename, bytes = bytes.len(), "document submitted");
        Ok(Submission {
            job_id,
            status: JobStatus::Processing,
        })
    }

    pub fn status(&self, id: JobId) -> Result<JobStatusView, Doc2JsonError> {
        self.registry.get(id).map(|job| JobStatusView::from(&job))
    }

    /// Page results of a completed job.
    pub fn results(&self, id: JobId) -> Result<JobResults, Doc2JsonError> {
        let job = self.registry.get(id)?;
        match job.state {
            JobState::Processing => Err(Doc2JsonError::JobNotReady(id)),
            JobState::Failed { error } => Err(Doc2JsonError::JobFailed { job_id: id, error }),
            JobState::Completed { pages } => Ok(JobResults {
                job_id: id,
                filename: job.filename,
                page_count: pages.len(),
                results: pages,
                created_at: job.created_at,
            }),
        }
    }

    /// Forget a job and remove its files. Allowed while it is processing.
    pub async fn delete(&self, id: JobId) -> Result<(), Doc2JsonError> {
        self.registry.delete(id).await.map(|_| ())
    }

    pub fn list(&self) -> Vec<JobSummary> {
        self.registry.list()
    }

    /// Stop accepting work and wait for queued jobs to finish.
    pub async fn shutdown(self) {
        self.queue.shutdown().await;
    }
}

fn aggregator_for(config: &AnalyzerConfig, client: Arc<dyn ModelClient>) -> DocumentAggregator {
    let progress: ProgressCallback = config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(TracingProgress));
    DocumentAggregator::new(PageAnalyzer::new(client, config.prompt()))
        .with_page_concurrency(config.page_concurrency)
        .with_progress(progress)
}

/// Analyse one local document synchronously, outside the job system.
///
/// Pages are rendered into a temporary directory that is removed on return.
pub async fn analyze_file(
    document: &Path,
    config: &AnalyzerConfig,
) -> Result<Vec<PageResult>, Doc2JsonError> {
    let renderer: Arc<dyn PageRenderer> = Arc::new(PdfiumRenderer::from_config(config));
    let client: Arc<dyn ModelClient> = Arc::new(LlmModelClient::from_config(config)?);
    analyze_file_with(document, config, renderer, client).await
}

/// [`analyze_file`] with an explicit renderer and model client.
pub async fn analyze_file_with(
    document: &Path,
    config: &AnalyzerConfig,
    renderer: Arc<dyn PageRenderer>,
    client: Arc<dyn ModelClient>,
) -> Result<Vec<PageResult>, Doc2JsonError> {
    let workspace = TempDir::new().map_err(|e| Doc2JsonError::Internal(e.to_string()))?;
    let pipeline = DocumentPipeline::new(renderer, aggregator_for(config, client));
    pipeline.run(document, &workspace.path().join("processed")).await
}
