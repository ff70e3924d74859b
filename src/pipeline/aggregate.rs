//! Document aggregation: analyse every page, isolate page failures, keep order.

use crate::output::{PageOutcome, PageResult};
use crate::pipeline::analyze::PageAnalyzer;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;

/// Runs a [`PageAnalyzer`] over a document's pages.
#[derive(Clone)]
pub struct DocumentAggregator {
    analyzer: PageAnalyzer,
    page_concurrency: usize,
    progress: ProgressCallback,
}

impl DocumentAggregator {
    pub fn new(analyzer: PageAnalyzer) -> Self {
        Self {
            analyzer,
            page_concurrency: 1,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Model calls in flight at once. Results stay in page order.
    pub fn with_page_concurrency(mut self, n: usize) -> Self {
        self.page_concurrency = n.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn analyzer(&self) -> &PageAnalyzer {
        &self.analyzer
    }

    /// One [`PageResult`] per input image, in input order.
    ///
    /// Never fails: a page whose call or parse fails carries the error text
    /// and the remaining pages are still analysed.
    pub async fn aggregate(&self, pages: &[PathBuf]) -> Vec<PageResult> {
        let total = pages.len();
        self.progress.on_document_start(total);

        let results: Vec<PageResult> = stream::iter(pages.iter().cloned().enumerate())
            .map(|(idx, image)| self.analyze_page(idx + 1, total, image))
            .buffered(self.page_concurrency)
            .collect()
            .await;

        let success = results.iter().filter(|r| !r.outcome.is_error()).count();
        self.progress.on_document_complete(total, success);
        results
    }

    async fn analyze_page(&self, page_number: usize, total: usize, image: PathBuf) -> PageResult {
        self.progress.on_page_start(page_number, total);

        let outcome = PageOutcome::from(self.analyzer.analyze(&image).await);
        match &outcome {
            PageOutcome::Data(_) => self.progress.on_page_complete(page_number, total),
            PageOutcome::Error(e) => self.progress.on_page_error(page_number, total, e),
        }

        PageResult {
            page_number,
            total_pages: total,
            source_file: image.display().to_string(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::pipeline::llm::ModelClient;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replies per file name: `bad` pages get prose, `down` pages fail the call.
    struct ByName {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ModelClient for ByName {
        async fn complete(&self, image: &Path, _prompt: &str) -> Result<String, PageError> {
            let name = image.file_name().unwrap().to_string_lossy().to_string();
            self.seen.lock().unwrap().push(name.clone());
            if name.contains("slow") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if name.contains("bad") {
                Ok("not json at all".into())
            } else if name.contains("down") {
                Err(PageError::ModelCallFailed {
                    detail: "connection reset".into(),
                })
            } else {
                Ok(format!("```json\n{{\"page\":\"{name}\"}}\n```"))
            }
        }
    }

    fn aggregator(concurrency: usize) -> (DocumentAggregator, Arc<ByName>) {
        let client = Arc::new(ByName {
            seen: Mutex::new(Vec::new()),
        });
        let agg = DocumentAggregator::new(PageAnalyzer::new(client.clone(), "p"))
            .with_page_concurrency(concurrency);
        (agg, client)
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("processed/{n}"))).collect()
    }

    #[tokio::test]
    async fn failures_are_isolated_and_numbered() {
        let (agg, _) = aggregator(1);
        let pages = paths(&["p1.jpg", "bad2.jpg", "p3.jpg", "down4.jpg", "p5.jpg"]);

        let results = agg.aggregate(&pages).await;

        assert_eq!(results.len(), 5);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.page_number, i + 1);
            assert_eq!(r.total_pages, 5);
            assert_eq!(r.source_file, pages[i].display().to_string());
        }
        let errors: Vec<usize> = results
            .iter()
            .filter(|r| r.outcome.is_error())
            .map(|r| r.page_number)
            .collect();
        assert_eq!(errors, vec![2, 4]);
        assert!(results[1]
            .error()
            .unwrap()
            .starts_with("Invalid JSON response from model"));
        assert!(results[3].error().unwrap().contains("connection reset"));
        assert_eq!(results[2].data().unwrap().extra["page"], "p3.jpg");
    }

    #[tokio::test]
    async fn calls_start_in_page_order() {
        let (agg, client) = aggregator(1);
        let pages = paths(&["a.jpg", "b.jpg", "c.jpg"]);
        agg.aggregate(&pages).await;
        assert_eq!(*client.seen.lock().unwrap(), vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[tokio::test]
    async fn concurrent_calls_keep_result_order() {
        let (agg, _) = aggregator(4);
        let pages = paths(&["slow1.jpg", "p2.jpg", "slow3.jpg", "p4.jpg"]);
        let results = agg.aggregate(&pages).await;
        let order: Vec<usize> = results.iter().map(|r| r.page_number).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
        assert!(results.iter().all(|r| !r.outcome.is_error()));
    }

    // Job workers run on a multi-threaded runtime, so the whole document
    // future must be spawnable.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn aggregation_runs_on_a_spawned_task() {
        let (agg, _) = aggregator(2);
        let pages = paths(&["p1.jpg", "bad2.jpg", "p3.jpg"]);

        let results = tokio::spawn(async move { agg.aggregate(&pages).await })
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[1].outcome.is_error());
    }

    #[tokio::test]
    async fn empty_document_yields_no_results() {
        let (agg, _) = aggregator(1);
        assert!(agg.aggregate(&[]).await.is_empty());
    }
}
