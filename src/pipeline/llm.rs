//! Model client: one page image + prompt in, raw model text out.
//!
//! [`ModelClient`] is the seam the analyzer calls through; tests substitute
//! scripted clients. [`LlmModelClient`] is the production implementation on
//! top of any `edgequake_llm` provider. There is no retry and no timeout:
//! one call per page, and its failure is that page's failure.

use crate::config::{AnalyzerConfig, DEFAULT_MODEL};
use crate::error::{Doc2JsonError, PageError};
use crate::pipeline::encode::encode_page_file;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Remote vision model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `prompt` with the page image; return the model's text verbatim.
    async fn complete(&self, image: &Path, prompt: &str) -> Result<String, PageError>;

    /// Model identifier for logs and `/health`.
    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// [`ModelClient`] backed by an `edgequake_llm` provider.
pub struct LlmModelClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
    options: CompletionOptions,
}

impl std::fmt::Debug for LlmModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmModelClient")
            .field("model", &self.model)
            .field("max_tokens", &self.options.max_tokens)
            .finish_non_exhaustive()
    }
}

impl LlmModelClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalyzerConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            options: build_options(config),
        }
    }

    /// Resolve a provider from `config` and the environment.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, Doc2JsonError> {
        let provider = resolve_provider(config)?;
        info!(model = %config.model, "model client ready");
        Ok(Self::new(provider, config))
    }
}

#[async_trait]
impl ModelClient for LlmModelClient {
    async fn complete(&self, image: &Path, prompt: &str) -> Result<String, PageError> {
        let image_data = encode_page_file(image).await?;
        let messages = vec![ChatMessage::user_with_images(prompt, vec![image_data])];

        let start = Instant::now();
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| PageError::ModelCallFailed {
                detail: e.to_string(),
            })?;

        debug!(
            image = %image.display(),
            input_tokens = response.prompt_tokens,
            output_tokens = response.completion_tokens,
            chars = response.content.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "model responded"
        );
        Ok(response.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn build_options(config: &AnalyzerConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Doc2JsonError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Doc2JsonError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most to least specific:
///
/// 1. a pre-built `config.provider`;
/// 2. `config.provider_name` with `config.model`;
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set;
/// 4. OpenAI, when `OPENAI_API_KEY` is set;
/// 5. whatever `ProviderFactory::from_env` detects.
pub fn resolve_provider(config: &AnalyzerConfig) -> Result<Arc<dyn LLMProvider>, Doc2JsonError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = if config.model.is_empty() {
        DEFAULT_MODEL
    } else {
        config.model.as_str()
    };

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_vision_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Doc2JsonError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {e}"
            ),
        })?;

    Ok(llm_provider)
}
