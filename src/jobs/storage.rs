//! On-disk layout for uploads and rendered pages.
//!
//! ```text
//! <upload_dir>/<job_id>/<filename>
//! <upload_dir>/<job_id>/processed/page_001.jpg
//! ```
//!
//! `JobStorage` owns everything under `<upload_dir>/<job_id>` and removes it
//! when the registry deletes the job.

use super::{ArtifactPurger, JobId};
use crate::error::Doc2JsonError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PAGES_DIR: &str = "processed";
const FALLBACK_NAME: &str = "upload";

#[derive(Debug, Clone)]
pub struct JobStorage {
    root: PathBuf,
}

impl JobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, id: JobId) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Where the renderer writes `page_NNN.jpg` files for a job.
    pub fn pages_dir(&self, id: JobId) -> PathBuf {
        self.job_dir(id).join(PAGES_DIR)
    }

    /// Write the uploaded bytes to `<upload_dir>/<job_id>/<filename>`.
    ///
    /// Only the final path component of `filename` is used. On failure the
    /// job directory is removed again (best effort).
    pub async fn persist_upload(
        &self,
        id: JobId,
        filename: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, Doc2JsonError> {
        let dir = self.job_dir(id);
        let path = dir.join(sanitize_filename(filename));

        let written = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, bytes).await
        }
        .await;

        match written {
            Ok(()) => {
                debug!(job_id = %id, path = %path.display(), bytes = bytes.len(), "upload stored");
                Ok(path)
            }
            Err(source) => {
                if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                    debug!(job_id = %id, error = %e, "cleanup after failed store");
                }
                Err(Doc2JsonError::StorageFailed { path, source })
            }
        }
    }
}

#[async_trait]
impl ArtifactPurger for JobStorage {
    async fn purge(&self, job_id: JobId) {
        let dir = self.job_dir(job_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!(job_id = %job_id, dir = %dir.display(), "job artifacts removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(job_id = %job_id, dir = %dir.display(), error = %e, "could not remove job artifacts"),
        }
    }
}

/// Strip any directory components from a client-supplied name.
pub(crate) fn sanitize_filename(filename: &str) -> String {
    // Clients on Windows send backslash-separated names.
    let last = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    match Path::new(last).file_name().and_then(|n| n.to_str()) {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => FALLBACK_NAME.to_string(),
    }
}
