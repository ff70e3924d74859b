//! Scripted renderer and model client shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_doc2json::pipeline::render::{page_file_name, prepare_output_dir};
use edgequake_doc2json::{
    AnalyzerConfig, Doc2JsonError, DocumentService, JobId, JobStatus, ModelClient, PageError,
    PageRenderer,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Writes `pages` placeholder page files, or fails when `fail_with` is set.
pub struct FakeRenderer {
    pub pages: usize,
    pub fail_with: Option<String>,
}

impl FakeRenderer {
    pub fn pages(pages: usize) -> Arc<Self> {
        Arc::new(Self {
            pages,
            fail_with: None,
        })
    }

    pub fn failing(detail: &str) -> Arc<Self> {
        Arc::new(Self {
            pages: 0,
            fail_with: Some(detail.to_string()),
        })
    }
}

impl PageRenderer for FakeRenderer {
    fn render(&self, document: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, Doc2JsonError> {
        if let Some(detail) = &self.fail_with {
            return Err(Doc2JsonError::RenderFailed {
                path: document.to_path_buf(),
                detail: detail.clone(),
            });
        }
        prepare_output_dir(output_dir)?;
        (1..=self.pages)
            .map(|n| {
                let path = output_dir.join(page_file_name(n));
                std::fs::write(&path, b"jpeg").map_err(|source| {
                    Doc2JsonError::StorageFailed {
                        path: path.clone(),
                        source,
                    }
                })?;
                Ok(path)
            })
            .collect()
    }
}

/// Answers with a small letter record naming the page, except for the
/// pages listed in `garbled` (unparseable text) and `unreachable`
/// (transport error). When `gate` is set every call waits for a permit.
#[derive(Default)]
pub struct ScriptedClient {
    pub garbled: HashSet<usize>,
    pub unreachable: HashSet<usize>,
    pub gate: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn garbling(pages: &[usize]) -> Arc<Self> {
        Arc::new(Self {
            garbled: pages.iter().copied().collect(),
            ..Self::default()
        })
    }

    pub fn gated(gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn page_number(image: &Path) -> usize {
    image
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix("page_"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn complete(&self, image: &Path, _prompt: &str) -> Result<String, PageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|e| PageError::ModelCallFailed {
                detail: e.to_string(),
            })?;
        }
        let page = page_number(image);
        if self.unreachable.contains(&page) {
            return Err(PageError::ModelCallFailed {
                detail: "connection reset".into(),
            });
        }
        if self.garbled.contains(&page) {
            return Ok("I could not read this page, sorry.".into());
        }
        Ok(format!(
            "```json\n{{\"document_classification\": {{\"type\": \"official_letter\"}}, \"page_marker\": {page}}}\n```"
        ))
    }

    fn model_name(&self) -> &str {
        "scripted-vision"
    }
}

pub fn test_config(upload_dir: &Path) -> AnalyzerConfig {
    AnalyzerConfig::builder()
        .upload_dir(upload_dir)
        .max_file_size_mb(1)
        .worker_count(2)
        .build()
        .unwrap()
}

pub fn service_with(
    upload_dir: &Path,
    renderer: Arc<dyn PageRenderer>,
    client: Arc<dyn ModelClient>,
) -> DocumentService {
    DocumentService::new(test_config(upload_dir), renderer, client)
}

/// Poll until the job leaves `processing`; panics after five seconds.
pub async fn wait_terminal(service: &DocumentService, id: JobId) -> JobStatus {
    for _ in 0..500 {
        let status = service.status(id).unwrap().status;
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not finish in time");
}
