//! Per-page and per-job result types.

use crate::error::PageError;
use crate::jobs::{Job, JobId, JobStatus};
use crate::schema::ExtractionRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of analysing one page image.
///
/// Serialised flat into the surrounding [`PageResult`], so a page carries
/// exactly one of `"data"` or `"error"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOutcome {
    Data(ExtractionRecord),
    Error(String),
}

impl PageOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, PageOutcome::Error(_))
    }
}

impl From<Result<ExtractionRecord, PageError>> for PageOutcome {
    fn from(result: Result<ExtractionRecord, PageError>) -> Self {
        match result {
            Ok(record) => PageOutcome::Data(record),
            Err(e) => PageOutcome::Error(e.to_string()),
        }
    }
}

/// One page of an analysed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed position in the document.
    pub page_number: usize,
    pub total_pages: usize,
    /// Path of the rendered page image the record was extracted from.
    pub source_file: String,
    #[serde(flatten)]
    pub outcome: PageOutcome,
}

impl PageResult {
    pub fn data(&self) -> Option<&ExtractionRecord> {
        match &self.outcome {
            PageOutcome::Data(record) => Some(record),
            PageOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            PageOutcome::Error(e) => Some(e),
            PageOutcome::Data(_) => None,
        }
    }
}

/// Response body of a status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub page_count: Option<usize>,
    pub error: Option<String>,
}

impl From<&Job> for JobStatusView {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status(),
            filename: job.filename.clone(),
            created_at: job.created_at,
            page_count: job.page_count(),
            error: job.error().map(str::to_owned),
        }
    }
}

/// Response body of a results query on a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResults {
    pub job_id: JobId,
    pub filename: String,
    pub page_count: usize,
    pub results: Vec<PageResult>,
    pub created_at: DateTime<Utc>,
}
