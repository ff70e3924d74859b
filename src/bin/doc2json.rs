//! CLI binary for edgequake-doc2json.
//!
//! `doc2json serve` runs the HTTP job server; `doc2json analyze` processes
//! one document in the foreground and prints its page results as JSON.
//! Both map their flags onto `AnalyzerConfig`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_doc2json::pipeline::input::resolve_input;
use edgequake_doc2json::server;
use edgequake_doc2json::{
    analyze_file, AnalysisProgressCallback, AnalyzerConfig, AnalyzerConfigBuilder,
    DocumentService, PageResult, ProgressCallback, DEFAULT_MODEL,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Progress bar for `analyze` ───────────────────────────────────────────────

/// Live progress bar plus one line per finished page.
struct CliProgress {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(SPINNER),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Rendering pages…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&page_num)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AnalysisProgressCallback for CliProgress {
    fn on_document_start(&self, total_pages: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(SPINNER),
        );
        self.bar.set_length(total_pages as u64);
        self.bar.set_prefix("Analysing");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize) {
        let secs = self.elapsed(page_num);
        self.bar.println(format!(
            "  {} Page {page_num:>3}/{total:<3}  {}",
            green("✓"),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed(page_num);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {page_num:>3}/{total:<3}  {}  {}",
            red("✗"),
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_pages.saturating_sub(success_count);
        if failed == 0 {
            eprintln!("{} {} pages analysed", green("✔"), bold(&success_count.to_string()));
        } else {
            eprintln!(
                "{} {}/{} pages analysed  ({} failed)",
                red("⚠"),
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

// ── Command line ─────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the job server on the default port
  doc2json serve

  # Analyse a scan and write the page records to a file
  doc2json analyze letter.pdf -o letter.json

  # Use a specific model and provider
  doc2json analyze --model gpt-4.1 --provider openai scan.png

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when --provider is absent
  EDGEQUAKE_MODEL         Model ID
  PDFIUM_LIB_PATH         Path to libpdfium (defaults to the system library)
  RUST_LOG                Overrides the log filter
"#;

/// Extract structured JSON records from scanned documents with Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "doc2json",
    version,
    about = "Extract structured JSON records from scanned documents with Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP job server.
    Serve(ServeArgs),
    /// Analyse one local file or URL in the foreground.
    Analyze(AnalyzeArgs),
}

/// Flags shared by both subcommands.
#[derive(Args, Debug)]
struct ModelArgs {
    /// Vision model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Max model output tokens per page.
    #[arg(long, env = "DOC2JSON_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "DOC2JSON_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Text file replacing the built-in extraction prompt.
    #[arg(long, env = "DOC2JSON_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Rasterisation DPI for PDF pages (72–400).
    #[arg(long, env = "DOC2JSON_IMAGE_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Page images wider than this are downscaled.
    #[arg(long, env = "DOC2JSON_MAX_IMAGE_WIDTH", default_value_t = 600)]
    max_image_width: u32,

    /// JPEG quality of rendered pages (1–100).
    #[arg(long, env = "DOC2JSON_IMAGE_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    image_quality: u8,

    /// Model calls in flight per document.
    #[arg(long, env = "DOC2JSON_PAGE_CONCURRENCY", default_value_t = 1)]
    page_concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOC2JSON_PDF_PASSWORD")]
    password: Option<String>,

    /// Path to libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "DOC2JSON_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Root directory for uploads and rendered pages.
    #[arg(long, env = "DOC2JSON_UPLOAD_DIR", default_value = "./data/uploads")]
    upload_dir: PathBuf,

    /// Largest accepted upload in MB.
    #[arg(long, env = "DOC2JSON_MAX_FILE_SIZE_MB", default_value_t = 50)]
    max_file_size_mb: u64,

    /// Accepted file extensions.
    #[arg(long, env = "DOC2JSON_ALLOWED_EXTENSIONS", value_delimiter = ',',
          default_value = "pdf,jpg,jpeg,png")]
    allowed_extensions: Vec<String>,

    /// Documents analysed concurrently.
    #[arg(long, env = "DOC2JSON_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, env = "DOC2JSON_LOG", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "DOC2JSON_LOG_JSON")]
    log_json: bool,

    /// Also write logs to a daily-rotated file in this directory.
    #[arg(long, env = "DOC2JSON_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Local PDF/JPEG/PNG path or HTTP/HTTPS URL.
    input: String,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOC2JSON_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress bar.
    #[arg(long, env = "DOC2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress everything except errors.
    #[arg(short, long)]
    quiet: bool,

    #[command(flatten)]
    model: ModelArgs,
}

impl ModelArgs {
    fn apply(&self, mut builder: AnalyzerConfigBuilder) -> Result<AnalyzerConfigBuilder> {
        builder = builder
            .model(&self.model)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .image_dpi(self.dpi)
            .max_image_width(self.max_image_width)
            .image_quality(self.image_quality)
            .page_concurrency(self.page_concurrency);
        if let Some(ref p) = self.provider {
            builder = builder.provider_name(p);
        }
        if let Some(ref pwd) = self.password {
            builder = builder.password(pwd);
        }
        if let Some(ref lib) = self.pdfium_lib_path {
            builder = builder.pdfium_lib_path(lib);
        }
        if let Some(ref path) = self.prompt_file {
            let prompt = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read prompt file {}", path.display()))?;
            builder = builder.extraction_prompt(prompt);
        }
        Ok(builder)
    }
}

// ── Logging ──────────────────────────────────────────────────────────────────

/// Install the global subscriber. The returned guard flushes the log file
/// and must live until exit.
fn init_tracing(default_filter: &str, json: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        default_filter.parse::<EnvFilter>().unwrap_or_else(|e| {
            eprintln!("WARN: '{default_filter}' is not a valid log filter ({e}); falling back to 'info'");
            EnvFilter::new("info")
        })
    });

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "doc2json.log"));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };
    let json_layer = json.then(|| fmt::layer().json().with_writer(io::stderr));
    let text_layer = (!json).then(|| fmt::layer().with_target(true).with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();
    guard
}

// ── Subcommands ──────────────────────────────────────────────────────────────

async fn run_serve(args: ServeArgs) -> Result<()> {
    let _guard = init_tracing(&args.log_level, args.log_json, args.log_dir.as_deref());
    info!(version = env!("CARGO_PKG_VERSION"), "doc2json server starting");

    let builder = AnalyzerConfig::builder()
        .upload_dir(&args.upload_dir)
        .max_file_size_mb(args.max_file_size_mb)
        .allowed_extensions(&args.allowed_extensions)
        .worker_count(args.workers);
    let config = args.model.apply(builder)?.build()?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;

    let service = DocumentService::from_config(config).context("Failed to start document service")?;
    server::serve(args.bind, service)
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let show_progress = !args.quiet && !args.no_progress;
    let filter = if args.verbose {
        "debug"
    } else if args.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    let _guard = init_tracing(filter, false, None);

    let mut builder = args
        .model
        .apply(AnalyzerConfig::builder())?
        .download_timeout_secs(args.download_timeout);
    let progress = show_progress.then(CliProgress::new);
    if let Some(ref p) = progress {
        builder = builder.progress_callback(Arc::clone(p) as ProgressCallback);
    }
    let config = builder.build()?;

    let input = resolve_input(&args.input, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to open {}", args.input))?;
    let extension = input
        .path()
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !config.is_allowed_extension(extension) {
        bail!(
            "Unsupported file type '.{extension}'. Allowed: {}",
            config.allowed_extensions_display()
        );
    }

    let outcome = analyze_file(input.path(), &config).await;
    if let (Err(_), Some(p)) = (&outcome, &progress) {
        p.bar.finish_and_clear();
    }
    let results: Vec<PageResult> = outcome.context("Analysis failed")?;
    let json = serde_json::to_string_pretty(&results).context("Failed to serialise results")?;

    match args.output {
        Some(ref path) => {
            tokio::fs::write(path, json.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !args.quiet {
                eprintln!("{} Wrote {}", green("✔"), path.display());
            }
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    let failed = results.iter().filter(|r| r.outcome.is_error()).count();
    if !results.is_empty() && failed == results.len() {
        bail!("All {failed} pages failed");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Serve(args) => run_serve(args).await,
        Command::Analyze(args) => run_analyze(args).await,
    }
}
