//! CLI binary for menu2json.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints JSON envelopes.

use anyhow::{Context, Result};
use clap::Parser;
use menu2json::{
    sanitized_text, Envelope, ExtractionConfig, ExtractionOutput, ExtractionProgressCallback,
    MenuExtractor, MenuItem, OcrBackendKind, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar plus one log line per finished document. Documents finish
/// out of order, so start times are tracked per index.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} menus  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_document_start(&self, index: usize, _total: usize, input: &str) {
        self.start_times
            .lock()
            .unwrap()
            .insert(index, Instant::now());
        self.bar.set_message(input.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, item_count: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Menu {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{item_count:>4} items")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let first_line = error.lines().next().unwrap_or_default();
        let msg = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} Menu {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);

        if failed == 0 {
            eprintln!(
                "{} {} menus extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} menus extracted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Photo of a menu → JSON envelope on stdout
  menu2json menu.jpg

  # Bare item array, written to a file
  menu2json --raw menu.jpg -o menu.json

  # CSV / spreadsheet exports need no OCR and no API key
  menu2json items.csv specials.xlsx

  # Phone photo read by a vision model instead of tesseract
  menu2json --ocr vision --provider openai --model gpt-4.1-mini photo.jpg

  # Check what tesseract sees before spending tokens
  menu2json --text-only menu.png

OUTPUT:
  {"status": "success", "data": [{"category", "subCategory", "name",
   "description", "price"}, ...]}
  {"status": "failure", "data": null, "message": "..."}   (exit status 1)

  With several inputs, stdout holds one envelope per input, in input order.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when --provider is not given
  EDGEQUAKE_MODEL         Model used together with EDGEQUAKE_LLM_PROVIDER
  MENU2JSON_*             Fallback for every flag, e.g. MENU2JSON_API_TIMEOUT=60
  RUST_LOG                Log filter (logs go to stderr)

  Variables are also read from a .env file in the working directory.
"#;

/// Extract structured menu items from menu photos, CSV files and spreadsheets.
#[derive(Parser, Debug)]
#[command(
    name = "menu2json",
    version,
    about = "Extract structured menu items from menu photos, CSV files and spreadsheets",
    long_about = "Reads restaurant menus (PNG/JPEG photos, CSV, XLSX/XLS/ODS, plain text; local \
files or URLs), OCRs images, asks an LLM to structure the text, and prints a JSON list of \
{category, subCategory, name, description, price} records.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file paths or HTTP/HTTPS URLs.
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<String>,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "MENU2JSON_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-nano, llama-3.3-70b-versatile).
    #[arg(long, env = "MENU2JSON_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, …
    #[arg(
        long,
        env = "MENU2JSON_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set."
    )]
    provider: Option<String>,

    /// OCR engine for images.
    #[arg(long, env = "MENU2JSON_OCR", value_enum, default_value = "tesseract")]
    ocr: OcrArg,

    /// Tesseract executable.
    #[arg(long, env = "MENU2JSON_TESSERACT_BIN")]
    tesseract_bin: Option<PathBuf>,

    /// Drop a lone 2 or 7 that OCR read in place of the rupee sign ("2 250" → "250").
    #[arg(long, env = "MENU2JSON_STRIP_LEADING_DIGIT")]
    strip_leading_digit: bool,

    /// Text file with a custom extraction prompt; `{text}` marks where the menu goes.
    #[arg(long, env = "MENU2JSON_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "MENU2JSON_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per menu.
    #[arg(long, env = "MENU2JSON_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM call timeout in seconds.
    #[arg(long, env = "MENU2JSON_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "MENU2JSON_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Menus processed at once when several inputs are given.
    #[arg(short, long, env = "MENU2JSON_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Print the bare item array instead of the status envelope.
    #[arg(long, env = "MENU2JSON_RAW")]
    raw: bool,

    /// Print the sanitized OCR text and exit (no LLM call).
    #[arg(long)]
    text_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MENU2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MENU2JSON_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "MENU2JSON_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OcrArg {
    Tesseract,
    Vision,
}

impl From<OcrArg> for OcrBackendKind {
    fn from(v: OcrArg) -> Self {
        match v {
            OcrArg::Tesseract => OcrBackendKind::Tesseract,
            OcrArg::Vision => OcrBackendKind::Vision,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Before parsing, so `env = ...` fallbacks see values from .env.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.text_only && cli.inputs.len() > 1;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    match run(&cli, show_progress).await {
        Ok(code) => code,
        Err(e) => {
            // Fatal before any document result exists: one failure envelope.
            let message = format!("{e:#}");
            if let Err(write_err) = emit(&cli, &Envelope::failure(&message)).await {
                eprintln!("{} {write_err:#}", red("error:"));
            }
            eprintln!("{} {message}", red("error:"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<ExitCode> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new(cli.inputs.len());
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(cli, progress_cb).await?;

    // ── Text-only mode ───────────────────────────────────────────────────
    if cli.text_only {
        for input in &cli.inputs {
            let text = sanitized_text(input, &config)
                .await
                .with_context(|| format!("Failed to read text from '{input}'"))?;
            if cli.inputs.len() > 1 {
                println!("==> {input} <==");
            }
            println!("{text}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let extractor = MenuExtractor::new(config).context("Could not set up the LLM provider")?;

    // ── Single document ──────────────────────────────────────────────────
    if let [input] = cli.inputs.as_slice() {
        let output = extractor
            .extract(input)
            .await
            .with_context(|| format!("Extraction failed for '{input}'"))?;
        print_summary(cli, &output);

        if cli.raw {
            emit(cli, &output.items).await?;
        } else {
            emit(cli, &Envelope::success(output.items)).await?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Batch ────────────────────────────────────────────────────────────
    let results = extractor.extract_many(&cli.inputs).await;
    let failed = results.iter().filter(|r| r.is_err()).count();

    if cli.raw {
        let items: Vec<Vec<MenuItem>> = results
            .into_iter()
            .zip(&cli.inputs)
            .map(|(r, input)| match r {
                Ok(output) => output.items,
                Err(e) => {
                    eprintln!("{} {input}: {e}", red("error:"));
                    Vec::new()
                }
            })
            .collect();
        emit(cli, &items).await?;
    } else {
        let envelopes: Vec<Envelope> = results
            .into_iter()
            .map(|r| match r {
                Ok(output) => Envelope::success(output.items),
                Err(e) => Envelope::failure(e.to_string()),
            })
            .collect();
        emit(cli, &envelopes).await?;
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .ocr(cli.ocr.into())
        .strip_leading_digit(cli.strip_leading_digit)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .concurrency(cli.concurrency);

    if let Some(ref path) = cli.prompt_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt_template(template);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref bin) = cli.tesseract_bin {
        builder = builder.tesseract_bin(bin);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Write pretty JSON to `--output` or stdout.
async fn emit<T: Serialize + ?Sized>(cli: &Cli, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    match cli.output {
        Some(ref path) => write_output(path, &json).await,
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

async fn write_output(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    tokio::fs::write(path, format!("{json}\n"))
        .await
        .with_context(|| format!("Failed to write {:?}", path))
}

fn print_summary(cli: &Cli, output: &ExtractionOutput) {
    if cli.quiet {
        return;
    }
    let stats = &output.stats;
    let mut line = format!(
        "{}  {} items  {}ms",
        green("✔"),
        bold(&output.items.len().to_string()),
        stats.total_duration_ms
    );
    if stats.model_called {
        line.push_str(&format!(
            "  {} tokens in / {} out",
            dim(&stats.input_tokens.to_string()),
            dim(&stats.output_tokens.to_string()),
        ));
    }
    if let Some(ref path) = cli.output {
        line.push_str(&format!("  →  {}", bold(&path.display().to_string())));
    }
    eprintln!("{line}");
}
