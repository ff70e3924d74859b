//! Background work queue.
//!
//! Submissions push a [`WorkUnit`] onto an unbounded channel; one dispatcher
//! task drains it with up to `worker_count` units in flight. Each unit runs
//! its [`JobProcessor`] inside its own spawned task so that a panic surfaces
//! as a [`tokio::task::JoinError`] and still ends in a terminal write.

use super::{JobId, JobRegistry};
use crate::error::Doc2JsonError;
use crate::output::PageResult;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};

/// The render → analyse sequence for one stored document.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(
        &self,
        job_id: JobId,
        document: &Path,
        pages_dir: &Path,
    ) -> Result<Vec<PageResult>, Doc2JsonError>;
}

/// The only writer of a job's terminal state.
///
/// `finish` consumes the handle, so a unit of work can record at most one
/// outcome.
#[derive(Debug)]
pub struct CompletionHandle {
    job_id: JobId,
    registry: Arc<JobRegistry>,
}

impl CompletionHandle {
    pub(crate) fn new(job_id: JobId, registry: Arc<JobRegistry>) -> Self {
        Self { job_id, registry }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Record the outcome: `Ok` completes the job, `Err` fails it with the
    /// error's display text.
    pub fn finish(self, outcome: Result<Vec<PageResult>, Doc2JsonError>) {
        let write = match outcome {
            Ok(pages) => self.registry.mark_completed(self.job_id, pages),
            Err(e) => self.registry.mark_failed(self.job_id, e.to_string()),
        };
        match write {
            Ok(()) => {}
            Err(Doc2JsonError::JobNotFound(_)) => {
                warn!(job_id = %self.job_id, "job was deleted while processing; outcome discarded");
            }
            Err(e) => {
                error!(job_id = %self.job_id, error = %e, "terminal write rejected");
            }
        }
    }
}

/// One queued document.
#[derive(Debug)]
pub struct WorkUnit {
    pub job_id: JobId,
    pub document: PathBuf,
    pub pages_dir: PathBuf,
    pub completion: CompletionHandle,
}

/// Handle to the dispatcher. Dropping it (or calling [`JobQueue::shutdown`])
/// closes the channel; units already queued still run.
#[derive(Debug)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<WorkUnit>,
    registry: Arc<JobRegistry>,
    dispatcher: JoinHandle<()>,
}

impl JobQueue {
    /// Spawn the dispatcher. Must be called from within a tokio runtime.
    pub fn start(
        registry: Arc<JobRegistry>,
        processor: Arc<dyn JobProcessor>,
        worker_count: usize,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let (tx, rx) = mpsc::unbounded_channel::<WorkUnit>();

        let dispatcher = tokio::spawn(async move {
            UnboundedReceiverStream::new(rx)
                .for_each_concurrent(worker_count, |unit| run_unit(Arc::clone(&processor), unit))
                .await;
            debug!("job queue drained");
        });

        info!(worker_count, "job queue started");
        Self {
            tx,
            registry,
            dispatcher,
        }
    }

    /// Queue a registered job for background processing.
    ///
    /// If the dispatcher is gone the job is failed immediately, so it never
    /// sits in `processing` without a worker.
    pub fn enqueue(
        &self,
        job_id: JobId,
        document: PathBuf,
        pages_dir: PathBuf,
    ) -> Result<(), Doc2JsonError> {
        let unit = WorkUnit {
            job_id,
            document,
            pages_dir,
            completion: CompletionHandle::new(job_id, Arc::clone(&self.registry)),
        };
        if let Err(mpsc::error::SendError(unit)) = self.tx.send(unit) {
            unit.completion
                .finish(Err(Doc2JsonError::Internal("job queue is closed".into())));
            return Err(Doc2JsonError::Internal("job queue is closed".into()));
        }
        debug!(job_id = %job_id, "job enqueued");
        Ok(())
    }

    /// Stop accepting work and wait for queued units to finish.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.dispatcher.await {
            error!(error = %e, "job queue dispatcher ended abnormally");
        }
    }
}

async fn run_unit(processor: Arc<dyn JobProcessor>, unit: WorkUnit) {
    let WorkUnit {
        job_id,
        document,
        pages_dir,
        completion,
    } = unit;
    info!(job_id = %job_id, document = %document.display(), "job processing started");

    let task = tokio::spawn(async move { processor.process(job_id, &document, &pages_dir).await });

    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(Doc2JsonError::Internal(format!(
            "processing task panicked: {e}"
        ))),
        Err(e) => Err(Doc2JsonError::Internal(format!(
            "processing task was cancelled: {e}"
        ))),
    };
    completion.finish(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;
    use crate::output::PageOutcome;
    use std::time::Duration;

    enum Behaviour {
        Pages(usize),
        Fail,
        Panic,
    }

    struct Scripted(Behaviour);

    #[async_trait]
    impl JobProcessor for Scripted {
        async fn process(
            &self,
            _job_id: JobId,
            _document: &Path,
            _pages_dir: &Path,
        ) -> Result<Vec<PageResult>, Doc2JsonError> {
            match self.0 {
                Behaviour::Pages(n) => Ok((1..=n)
                    .map(|i| PageResult {
                        page_number: i,
                        total_pages: n,
                        source_file: format!("page_{i:03}.jpg"),
                        outcome: PageOutcome::Error("unused".into()),
                    })
                    .collect()),
                Behaviour::Fail => Err(Doc2JsonError::RenderFailed {
                    path: PathBuf::from("doc.pdf"),
                    detail: "corrupt".into(),
                }),
                Behaviour::Panic => panic!("renderer exploded"),
            }
        }
    }

    async fn run(behaviour: Behaviour) -> (Arc<JobRegistry>, JobId) {
        let registry = Arc::new(JobRegistry::new());
        let queue = JobQueue::start(Arc::clone(&registry), Arc::new(Scripted(behaviour)), 2);
        let id = registry.create("doc.pdf");
        queue
            .enqueue(id, PathBuf::from("doc.pdf"), PathBuf::from("pages"))
            .unwrap();
        queue.shutdown().await;
        (registry, id)
    }

    #[tokio::test]
    async fn success_completes_job() {
        let (registry, id) = run(Behaviour::Pages(3)).await;
        let job = registry.get(id).unwrap();
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.page_count(), Some(3));
    }

    #[tokio::test]
    async fn error_fails_job_with_message() {
        let (registry, id) = run(Behaviour::Fail).await;
        let job = registry.get(id).unwrap();
        assert_eq!(job.status(), JobStatus::Failed);
        assert!(job.error().unwrap().contains("corrupt"));
    }

    #[tokio::test]
    async fn panic_is_recorded_as_failure() {
        let (registry, id) = run(Behaviour::Panic).await;
        let job = registry.get(id).unwrap();
        assert_eq!(job.status(), JobStatus::Failed);
        assert!(job.error().unwrap().contains("panicked"));
    }

    #[tokio::test]
    async fn late_write_for_deleted_job_is_discarded() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry.create("doc.pdf");
        let handle = CompletionHandle::new(id, Arc::clone(&registry));
        registry.delete(id).await.unwrap();

        handle.finish(Ok(vec![]));

        assert!(registry.get(id).is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn slow_unit_does_not_block_others() {
        struct Sleepy;

        #[async_trait]
        impl JobProcessor for Sleepy {
            async fn process(
                &self,
                _job_id: JobId,
                document: &Path,
                _pages_dir: &Path,
            ) -> Result<Vec<PageResult>, Doc2JsonError> {
                if document == Path::new("slow.pdf") {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                Ok(vec![])
            }
        }

        let registry = Arc::new(JobRegistry::new());
        let queue = JobQueue::start(Arc::clone(&registry), Arc::new(Sleepy), 2);
        let slow = registry.create("slow.pdf");
        let fast = registry.create("fast.pdf");
        queue.enqueue(slow, "slow.pdf".into(), "p".into()).unwrap();
        queue.enqueue(fast, "fast.pdf".into(), "p".into()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while registry.get(fast).unwrap().status() == JobStatus::Processing {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("fast job should finish while slow job is in flight");

        assert_eq!(registry.get(slow).unwrap().status(), JobStatus::Processing);
    }
}
