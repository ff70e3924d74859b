//! Authoritative in-memory map from job id to [`Job`].
//!
//! The registry is constructed once per process and shared as
//! `Arc<JobRegistry>`. Map-level operations take the lock only for the map
//! access itself; purging a deleted job's files happens after it is released.
//! Nothing is persisted: all jobs are lost on restart.

use super::{Job, JobId, JobState, JobStatus, JobSummary};
use crate::error::Doc2JsonError;
use crate::output::PageResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Owner of a job's on-disk artifacts, told to remove them on delete.
#[async_trait]
pub trait ArtifactPurger: Send + Sync {
    async fn purge(&self, job_id: JobId);
}

/// State machine for every submitted document.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
    purger: Option<Arc<dyn ArtifactPurger>>,
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &self.len())
            .field("purger", &self.purger.as_ref().map(|_| "<dyn ArtifactPurger>"))
            .finish()
    }
}

impl JobRegistry {
    /// A registry with no artifact owner (deletes touch memory only).
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that asks `purger` to remove files when a job is deleted.
    pub fn with_purger(purger: Arc<dyn ArtifactPurger>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            purger: Some(purger),
        }
    }

    /// Allocate a fresh id and insert a `processing` job under it.
    pub fn create(&self, filename: impl Into<String>) -> JobId {
        let id = JobId::new();
        self.register(id, filename);
        id
    }

    /// Insert a `processing` job under an id allocated by the caller.
    ///
    /// Used by the submission path, which needs the id before the job exists
    /// to name the upload's storage directory.
    pub(crate) fn register(&self, id: JobId, filename: impl Into<String>) {
        let job = Job::new(id, filename);
        debug!(job_id = %id, filename = %job.filename, "job registered");
        self.write().insert(id, job);
    }

    /// Snapshot of one job.
    pub fn get(&self, id: JobId) -> Result<Job, Doc2JsonError> {
        self.read()
            .get(&id)
            .cloned()
            .ok_or(Doc2JsonError::JobNotFound(id))
    }

    /// `processing → completed`, recording every page result.
    pub fn mark_completed(&self, id: JobId, pages: Vec<PageResult>) -> Result<(), Doc2JsonError> {
        let page_count = pages.len();
        self.transition(id, JobState::Completed { pages })?;
        info!(job_id = %id, page_count, "job completed");
        Ok(())
    }

    /// `processing → failed`, recording the document-level error.
    pub fn mark_failed(&self, id: JobId, error: impl Into<String>) -> Result<(), Doc2JsonError> {
        let error = error.into();
        self.transition(id, JobState::Failed { error: error.clone() })?;
        warn!(job_id = %id, %error, "job failed");
        Ok(())
    }

    /// Remove a job and have its artifacts purged.
    ///
    /// The job is gone from the map before the purge starts.
    pub async fn delete(&self, id: JobId) -> Result<Job, Doc2JsonError> {
        let removed = self.forget(id)?;
        if let Some(purger) = &self.purger {
            purger.purge(id).await;
        }
        info!(job_id = %id, "job deleted");
        Ok(removed)
    }

    fn forget(&self, id: JobId) -> Result<Job, Doc2JsonError> {
        self.write()
            .remove(&id)
            .ok_or(Doc2JsonError::JobNotFound(id))
    }

    /// Summaries of every known job, oldest first. Callers must not rely on
    /// the order.
    pub fn list(&self) -> Vec<JobSummary> {
        let mut summaries: Vec<JobSummary> = self.read().values().map(Job::summary).collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn transition(&self, id: JobId, next: JobState) -> Result<(), Doc2JsonError> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(Doc2JsonError::JobNotFound(id))?;
        let from = job.status();
        if from != JobStatus::Processing {
            return Err(Doc2JsonError::InvalidTransition {
                job_id: id,
                from,
                to: next.status(),
            });
        }
        job.state = next;
        Ok(())
    }

    // A panic while holding the lock cannot leave a job half-written (every
    // mutation is a single assignment), so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::PageOutcome;
    use std::sync::Mutex;

    fn page(n: usize, total: usize) -> PageResult {
        PageResult {
            page_number: n,
            total_pages: total,
            source_file: format!("page_{n:03}.jpg"),
            outcome: PageOutcome::Error("boom".into()),
        }
    }

    #[derive(Default)]
    struct RecordingPurger(Mutex<Vec<JobId>>);

    #[async_trait]
    impl ArtifactPurger for RecordingPurger {
        async fn purge(&self, job_id: JobId) {
            self.0.lock().unwrap().push(job_id);
        }
    }

    #[test]
    fn create_starts_processing() {
        let registry = JobRegistry::new();
        let id = registry.create("scan.pdf");
        let job = registry.get(id).unwrap();
        assert_eq!(job.status(), JobStatus::Processing);
        assert_eq!(job.filename, "scan.pdf");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let registry = JobRegistry::new();
        let a = registry.create("a.pdf");
        let b = registry.create("a.pdf");
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let registry = JobRegistry::new();
        let id = JobId::new();
        assert!(matches!(registry.get(id), Err(Doc2JsonError::JobNotFound(_))));
        assert!(matches!(
            registry.delete(id).await,
            Err(Doc2JsonError::JobNotFound(_))
        ));
        assert!(matches!(
            registry.mark_failed(id, "x"),
            Err(Doc2JsonError::JobNotFound(_))
        ));
    }

    #[test]
    fn completion_sets_result_and_page_count() {
        let registry = JobRegistry::new();
        let id = registry.create("scan.pdf");
        registry
            .mark_completed(id, vec![page(1, 2), page(2, 2)])
            .unwrap();
        let job = registry.get(id).unwrap();
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.page_count(), Some(2));
        assert!(job.error().is_none());
    }

    #[test]
    fn terminal_states_are_absorbing() {
        let registry = JobRegistry::new();
        let done = registry.create("a.pdf");
        registry.mark_completed(done, vec![page(1, 1)]).unwrap();
        let before = registry.get(done).unwrap();

        let err = registry.mark_failed(done, "late").unwrap_err();
        assert!(matches!(
            err,
            Doc2JsonError::InvalidTransition {
                from: JobStatus::Completed,
                to: JobStatus::Failed,
                ..
            }
        ));
        assert!(registry.mark_completed(done, vec![]).is_err());
        assert_eq!(registry.get(done).unwrap(), before);

        let failed = registry.create("b.pdf");
        registry.mark_failed(failed, "corrupt").unwrap();
        assert!(registry.mark_completed(failed, vec![page(1, 1)]).is_err());
        let job = registry.get(failed).unwrap();
        assert_eq!(job.error(), Some("corrupt"));
        assert!(job.result().is_none());
    }

    #[tokio::test]
    async fn delete_removes_and_purges() {
        let purger = Arc::new(RecordingPurger::default());
        let registry = JobRegistry::with_purger(purger.clone());
        let id = registry.create("scan.pdf");
        let keep = registry.create("other.pdf");

        registry.delete(id).await.unwrap();

        assert!(matches!(registry.get(id), Err(Doc2JsonError::JobNotFound(_))));
        assert!(registry.list().iter().all(|s| s.job_id != id));
        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.list()[0].job_id, keep);
        assert_eq!(*purger.0.lock().unwrap(), vec![id]);
    }

    #[test]
    fn concurrent_writers_do_not_lose_jobs() {
        let registry = Arc::new(JobRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let id = registry.create(format!("{t}-{i}.pdf"));
                        if i % 2 == 0 {
                            registry.mark_completed(id, vec![]).unwrap();
                        } else {
                            registry.mark_failed(id, "x").unwrap();
                        }
                        let _ = registry.list();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.len(), 400);
        assert!(registry.list().iter().all(|s| s.status.is_terminal()));
    }
}
