//! Configuration for document analysis.
//!
//! Every knob lives in [`AnalyzerConfig`], built through
//! [`AnalyzerConfigBuilder`]. The binary maps its flags and environment
//! variables onto the builder; library users set only what they need.

use crate::error::Doc2JsonError;
use crate::progress::ProgressCallback;
use crate::prompts::DOCUMENT_EXTRACTION_PROMPT;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Extensions accepted when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png"];

/// Configuration for the analysis service and the one-shot CLI path.
///
/// # Example
/// ```rust
/// use edgequake_doc2json::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .upload_dir("/var/lib/doc2json")
///     .max_file_size_mb(20)
///     .image_dpi(150)
///     .worker_count(2)
///     .build()
///     .unwrap();
/// assert!(config.is_allowed_extension("PDF"));
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Root of per-job storage. Default: `./data/uploads`.
    pub upload_dir: PathBuf,

    /// Largest accepted upload in MiB. Default: 50.
    pub max_file_size_mb: u64,

    /// Lowercase extensions without the dot. Default: pdf, jpg, jpeg, png.
    pub allowed_extensions: Vec<String>,

    /// Page images wider than this are downscaled (aspect preserved). Default: 600.
    ///
    /// Narrow greyscale pages keep vision-token cost low; 600 px still leaves
    /// typed text legible to current models.
    pub max_image_width: u32,

    /// Rasterisation DPI for PDF pages. Range: 72–400. Default: 200.
    pub image_dpi: u32,

    /// JPEG quality of rendered pages, 1–100. Default: 85.
    pub image_quality: u8,

    /// Contrast multiplier applied after greyscale conversion. Default: 1.5.
    pub contrast_factor: f32,

    /// Vision model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 4096.
    ///
    /// Dense forms with many tables produce long records; too low a limit
    /// truncates the JSON and the page fails to parse.
    pub max_tokens: usize,

    /// Replaces the built-in extraction prompt.
    pub extraction_prompt: Option<String>,

    /// Documents processed concurrently by the job queue. Default: 4.
    pub worker_count: usize,

    /// Model calls in flight per document. Default: 1.
    pub page_concurrency: usize,

    /// Explicit pdfium library to bind. Falls back to the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// User password for encrypted PDFs.
    pub password: Option<String>,

    /// Download timeout for URL inputs (CLI) in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-page events while a document is analysed.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./data/uploads"),
            max_file_size_mb: 50,
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            max_image_width: 600,
            image_dpi: 200,
            image_quality: 85,
            contrast_factor: 1.5,
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            extraction_prompt: None,
            worker_count: 4,
            page_concurrency: 1,
            pdfium_lib_path: None,
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("upload_dir", &self.upload_dir)
            .field("max_file_size_mb", &self.max_file_size_mb)
            .field("allowed_extensions", &self.allowed_extensions)
            .field("max_image_width", &self.max_image_width)
            .field("image_dpi", &self.image_dpi)
            .field("image_quality", &self.image_quality)
            .field("contrast_factor", &self.contrast_factor)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_tokens", &self.max_tokens)
            .field("custom_prompt", &self.extraction_prompt.is_some())
            .field("worker_count", &self.worker_count)
            .field("page_concurrency", &self.page_concurrency)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl AnalyzerConfig {
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Case-insensitive; a leading dot is ignored.
    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        let ext = normalize_extension(extension);
        self.allowed_extensions.iter().any(|a| *a == ext)
    }

    /// Comma-separated allow-list for error messages.
    pub fn allowed_extensions_display(&self) -> String {
        self.allowed_extensions.join(",")
    }

    /// The prompt sent with every page image.
    pub fn prompt(&self) -> &str {
        self.extraction_prompt
            .as_deref()
            .unwrap_or(DOCUMENT_EXTRACTION_PROMPT)
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn max_file_size_mb(mut self, mb: u64) -> Self {
        self.config.max_file_size_mb = mb;
        self
    }

    /// Replace the allow-list. Entries are lowercased and stripped of dots.
    pub fn allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        list.dedup();
        self.config.allowed_extensions = list;
        self
    }

    pub fn max_image_width(mut self, px: u32) -> Self {
        self.config.max_image_width = px;
        self
    }

    pub fn image_dpi(mut self, dpi: u32) -> Self {
        self.config.image_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn image_quality(mut self, quality: u8) -> Self {
        self.config.image_quality = quality;
        self
    }

    pub fn contrast_factor(mut self, factor: f32) -> Self {
        self.config.contrast_factor = factor;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extraction_prompt = Some(prompt.into());
        self
    }

    pub fn worker_count(mut self, n: usize) -> Self {
        self.config.worker_count = n;
        self
    }

    pub fn page_concurrency(mut self, n: usize) -> Self {
        self.config.page_concurrency = n;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, Doc2JsonError> {
        let c = &self.config;
        if c.allowed_extensions.is_empty() {
            return Err(Doc2JsonError::InvalidConfig(
                "At least one allowed extension is required".into(),
            ));
        }
        if c.max_file_size_mb == 0 {
            return Err(Doc2JsonError::InvalidConfig(
                "Maximum file size must be ≥ 1 MB".into(),
            ));
        }
        if c.max_image_width == 0 {
            return Err(Doc2JsonError::InvalidConfig(
                "Maximum image width must be ≥ 1 px".into(),
            ));
        }
        if !(1..=100).contains(&c.image_quality) {
            return Err(Doc2JsonError::InvalidConfig(format!(
                "Image quality must be 1–100, got {}",
                c.image_quality
            )));
        }
        if !c.contrast_factor.is_finite() || c.contrast_factor <= 0.0 {
            return Err(Doc2JsonError::InvalidConfig(format!(
                "Contrast factor must be > 0, got {}",
                c.contrast_factor
            )));
        }
        if c.worker_count == 0 || c.page_concurrency == 0 {
            return Err(Doc2JsonError::InvalidConfig(
                "Worker count and page concurrency must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(Doc2JsonError::InvalidConfig("Model must not be empty".into()));
        }
        Ok(self.config)
    }
}
