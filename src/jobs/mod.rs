//! Job lifecycle: identity, state machine, storage and background queue.
//!
//! ```text
//!  submit ──▶ storage::persist_upload ──▶ registry::register ──▶ queue::enqueue
//!                                                                   │
//!        poll ◀── registry::get ◀── CompletionHandle::finish ◀── worker
//! ```
//!
//! A job has exactly one writer after creation: the [`queue::CompletionHandle`]
//! that travels with its unit of work and is consumed by the terminal write.

pub mod queue;
pub mod registry;
pub mod storage;

pub use queue::{CompletionHandle, JobProcessor, JobQueue, WorkUnit};
pub use registry::{ArtifactPurger, JobRegistry};
pub use storage::JobStorage;

use crate::output::PageResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque job identifier (UUID v4), never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Allocate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Externally visible lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` are absorbing.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        })
    }
}

/// Internal state: the result and the error can never coexist.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Processing,
    Completed { pages: Vec<PageResult> },
    Failed { error: String },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Processing => JobStatus::Processing,
            JobState::Completed { .. } => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }
}

/// One submitted document. Readers always hold a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub state: JobState,
}

impl Job {
    pub(crate) fn new(id: JobId, filename: impl Into<String>) -> Self {
        Self {
            id,
            filename: filename.into(),
            created_at: Utc::now(),
            state: JobState::Processing,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    /// Set once, at completion.
    pub fn page_count(&self) -> Option<usize> {
        match &self.state {
            JobState::Completed { pages } => Some(pages.len()),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&[PageResult]> {
        match &self.state {
            JobState::Completed { pages } => Some(pages),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.id,
            status: self.status(),
            filename: self.filename.clone(),
            created_at: self.created_at,
        }
    }
}

/// Row returned by [`JobRegistry::list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}
