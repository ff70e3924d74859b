//! Page analysis: one model call per page, then a lenient parse of the reply.

use crate::error::PageError;
use crate::pipeline::llm::ModelClient;
use crate::schema::ExtractionRecord;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Longest excerpt of an unparseable reply kept for diagnostics.
pub const EXCERPT_CHARS: usize = 500;

/// Calls the model once for a page image and parses its reply.
#[derive(Clone)]
pub struct PageAnalyzer {
    client: Arc<dyn ModelClient>,
    prompt: Arc<str>,
}

impl PageAnalyzer {
    pub fn new(client: Arc<dyn ModelClient>, prompt: impl Into<Arc<str>>) -> Self {
        Self {
            client,
            prompt: prompt.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// No retry and no caching: a failure here is final for the page.
    pub async fn analyze(&self, image: &Path) -> Result<ExtractionRecord, PageError> {
        let raw = self.client.complete(image, &self.prompt).await?;
        debug!(image = %image.display(), chars = raw.len(), "model reply received");
        let parsed = parse_model_response(&raw);
        if let Err(PageError::InvalidModelResponse { detail, excerpt }) = &parsed {
            debug!(image = %image.display(), %detail, %excerpt, "unparseable model reply");
        }
        parsed
    }
}

/// Parse a model reply into a record.
///
/// Surrounding whitespace is trimmed, then one leading ```` ```json ```` (or
/// bare ```` ``` ````) fence and one trailing ```` ``` ```` fence are removed
/// before the JSON parse.
pub fn parse_model_response(raw: &str) -> Result<ExtractionRecord, PageError> {
    let body = strip_code_fence(raw);
    serde_json::from_str(body).map_err(|e| PageError::InvalidModelResponse {
        detail: e.to_string(),
        excerpt: body.chars().take(EXCERPT_CHARS).collect(),
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}
