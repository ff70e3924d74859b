//! Page image → base64 `ImageData` for the multimodal request body.
//!
//! Rendered pages are already JPEG on disk, so the file bytes are sent as-is;
//! re-encoding would only add another lossy pass.

use crate::error::PageError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::Path;
use tracing::debug;

/// MIME type inferred from the file extension.
pub fn mime_type_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "" => "application/octet-stream".to_string(),
        other => format!("image/{other}"),
    }
}

/// Read a page image and wrap it for the VLM API.
///
/// `detail: "high"` keeps small print and table cells legible to
/// OpenAI-style tiling.
pub async fn encode_page_file(path: &Path) -> Result<ImageData, PageError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PageError::ImageUnreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    if bytes.is_empty() {
        return Err(PageError::ImageUnreadable {
            path: path.to_path_buf(),
            detail: "file is empty".into(),
        });
    }

    let b64 = STANDARD.encode(&bytes);
    debug!(path = %path.display(), encoded = b64.len(), "page encoded");
    Ok(ImageData::new(b64, mime_type_for(path)).with_detail("high"))
}
