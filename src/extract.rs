//! Extraction entry points.
//!
//! [`MenuExtractor`] owns the resolved model backend and OCR engine and runs
//! one document at a time through the pipeline. The free functions
//! ([`extract`], [`extract_sync`], [`extract_to_file`], [`extract_batch`])
//! build an extractor from an [`ExtractionConfig`] for one-shot use.
//!
//! Fatal failures come from two places only: reading the source
//! ([`crate::error::ExtractionError`]) and calling the model
//! ([`crate::error::ModelError`]). Once a completion exists, recovery and
//! normalization cannot fail; the worst case is an empty item list.

use crate::config::{ExtractionConfig, OcrBackendKind, DEFAULT_MODEL};
use crate::error::{ExtractionError, MenuError, ModelError};
use crate::output::{ExtractionOutput, ExtractionStats, MenuItem, SourceKind};
use crate::pipeline::llm::{CompletionBackend, CompletionRequest, LlmBackend};
use crate::pipeline::ocr::{OcrEngine, TesseractOcr, VisionOcr};
use crate::pipeline::sanitize::{decode_ocr_bytes, sanitize};
use crate::pipeline::{input, normalize, recover, tabular};
use crate::prompts::{build_prompt, build_prompt_with};
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs documents through the extraction pipeline.
///
/// Construction resolves the model backend and OCR engine up front, so a
/// missing credential fails here rather than halfway through a batch.
pub struct MenuExtractor {
    config: ExtractionConfig,
    backend: Arc<dyn CompletionBackend>,
    ocr: Arc<dyn OcrEngine>,
}

impl MenuExtractor {
    pub fn new(config: ExtractionConfig) -> Result<Self, MenuError> {
        let backend = resolve_backend(&config)?;
        let ocr = resolve_ocr(&config)?;
        info!(
            "Extractor ready: model backend '{}', OCR '{}'",
            backend.name(),
            ocr.name()
        );
        Ok(Self {
            config,
            backend,
            ocr,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract menu items from a local path or HTTP/HTTPS URL.
    ///
    /// The source kind comes from the file extension: images go through OCR
    /// and the model, `.txt` files skip OCR, CSV and spreadsheets skip both.
    pub async fn extract(&self, input_str: &str) -> Result<ExtractionOutput, MenuError> {
        let total_start = Instant::now();
        info!("Starting extraction: {}", input_str);

        let resolved = input::resolve_input(input_str, self.config.download_timeout_secs).await?;
        // `resolved` keeps any downloaded temp file alive until we return.
        self.extract_path(resolved.path(), resolved.kind(), total_start)
            .await
    }

    /// Extract menu items from text that has already been OCR'd.
    pub async fn extract_text(&self, raw_text: &str) -> Result<ExtractionOutput, MenuError> {
        let total_start = Instant::now();
        let mut stats = ExtractionStats {
            source_kind: Some(SourceKind::Text),
            ..Default::default()
        };
        let items = self.complete_text(raw_text, &mut stats).await?;
        Ok(finish(items, stats, total_start))
    }

    /// Extract menu items from uploaded bytes.
    ///
    /// `file_name` is only used for its extension, which decides the source
    /// kind. The bytes are written to a uniquely named temp file that is
    /// deleted when this returns, so concurrent uploads never collide.
    pub async fn extract_from_bytes(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<ExtractionOutput, MenuError> {
        let total_start = Instant::now();
        let suffix = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let mut tmp = tempfile::Builder::new()
            .prefix("menu-upload-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| MenuError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.flush())
            .map_err(|e| MenuError::Internal(format!("tempfile write: {e}")))?;
        debug!(
            "Stored {} uploaded bytes for '{}' at {}",
            bytes.len(),
            file_name,
            tmp.path().display()
        );

        let resolved = input::resolve_local(&tmp.path().to_string_lossy())?;
        self.extract_path(resolved.path(), resolved.kind(), total_start)
            .await
    }

    /// Extract several documents concurrently.
    ///
    /// At most `config.concurrency` documents are in flight at once. The
    /// returned vector is in input order, one result per input.
    pub async fn extract_many<S>(&self, inputs: &[S]) -> Vec<Result<ExtractionOutput, MenuError>>
    where
        S: AsRef<str> + Sync,
    {
        let total = inputs.len();
        let callback = self.config.progress_callback.as_ref();
        if let Some(cb) = callback {
            cb.on_batch_start(total);
        }

        let mut results: Vec<(usize, Result<ExtractionOutput, MenuError>)> =
            stream::iter(inputs.iter().enumerate().map(|(index, input)| async move {
                let input = input.as_ref();
                if let Some(cb) = callback {
                    cb.on_document_start(index, total, input);
                }
                let result = self.extract(input).await;
                if let Some(cb) = callback {
                    match &result {
                        Ok(output) => cb.on_document_complete(index, total, output.items.len()),
                        Err(e) => cb.on_document_error(index, total, &e.to_string()),
                    }
                }
                (index, result)
            }))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        let success_count = results.iter().filter(|(_, r)| r.is_ok()).count();
        info!("Batch complete: {}/{} documents", success_count, total);
        if let Some(cb) = callback {
            cb.on_batch_complete(total, success_count);
        }

        results.into_iter().map(|(_, r)| r).collect()
    }

    async fn extract_path(
        &self,
        path: &Path,
        kind: SourceKind,
        total_start: Instant,
    ) -> Result<ExtractionOutput, MenuError> {
        let mut stats = ExtractionStats {
            source_kind: Some(kind),
            ..Default::default()
        };

        let items = match kind {
            SourceKind::Csv | SourceKind::Spreadsheet => {
                let rows = read_table(path, kind).await?;
                let (items, dropped) = normalize::normalize_with_report(rows);
                stats.dropped_candidates = dropped;
                items
            }
            SourceKind::Text => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| ExtractionError::Io {
                        path: path.to_path_buf(),
                        source: e,
                    })?;
                self.complete_text(&decode_ocr_bytes(&bytes), &mut stats)
                    .await?
            }
            SourceKind::Image => {
                let ocr_start = Instant::now();
                let bytes = self.ocr.recognize(path).await?;
                stats.ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;
                self.complete_text(&decode_ocr_bytes(&bytes), &mut stats)
                    .await?
            }
        };

        Ok(finish(items, stats, total_start))
    }

    /// sanitize → prompt → model → recover → normalize.
    async fn complete_text(
        &self,
        raw_text: &str,
        stats: &mut ExtractionStats,
    ) -> Result<Vec<MenuItem>, MenuError> {
        let text = sanitize(raw_text, &self.config.sanitize);
        stats.sanitized_chars = text.chars().count();

        if text.trim().is_empty() {
            info!("No text left after sanitizing; skipping model call");
            return Ok(Vec::new());
        }

        let prompt = match self.config.prompt_template {
            Some(ref template) => build_prompt_with(template, &text),
            None => build_prompt(&text),
        };
        let request = CompletionRequest {
            prompt: &prompt,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let secs = self.config.api_timeout_secs;
        let llm_start = Instant::now();
        stats.model_called = true;
        let completion = tokio::time::timeout(
            Duration::from_secs(secs),
            self.backend.complete(request),
        )
        .await
        .map_err(|_| ModelError::Timeout { secs })??;
        stats.llm_duration_ms = llm_start.elapsed().as_millis() as u64;
        stats.input_tokens = completion.input_tokens;
        stats.output_tokens = completion.output_tokens;

        let recovered = recover::recover(&completion.text);
        stats.recovery = Some(recovered.strategy);

        let (items, dropped) = normalize::normalize_with_report(recovered.candidates);
        stats.dropped_candidates = dropped;
        Ok(items)
    }
}

// ── One-shot entry points ─────────────────────────────────────────────────

/// Extract menu items from a local path or HTTP/HTTPS URL.
///
/// This is the primary entry point for the library.
///
/// # Example
/// ```rust,no_run
/// use menu2json::{extract, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let output = extract("menu.jpg", &config).await?;
/// println!("{}", serde_json::to_string_pretty(&output.items)?);
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, MenuError> {
    MenuExtractor::new(config.clone())?
        .extract(input_str.as_ref())
        .await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, MenuError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MenuError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Extract a document and write its items as a pretty JSON array.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, MenuError> {
    let output = extract(input_str, config).await?;
    let json = serde_json::to_string_pretty(&output.items)
        .map_err(|e| MenuError::Internal(format!("serialise items: {e}")))?;
    write_atomic(output_path.as_ref(), json.as_bytes()).await?;
    Ok(output.stats)
}

/// Extract several documents with one shared extractor.
///
/// Fails as a whole only when the extractor cannot be built; per-document
/// failures are returned in place.
pub async fn extract_batch<S>(
    inputs: &[S],
    config: &ExtractionConfig,
) -> Result<Vec<Result<ExtractionOutput, MenuError>>, MenuError>
where
    S: AsRef<str> + Sync,
{
    let extractor = MenuExtractor::new(config.clone())?;
    Ok(extractor.extract_many(inputs).await)
}

/// OCR (or read) a document and return its sanitized text.
///
/// Needs no model credentials unless vision OCR is configured. Tabular
/// sources have no free text and are rejected.
pub async fn sanitized_text(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<String, MenuError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let raw = match resolved.kind() {
        SourceKind::Image => {
            let ocr = resolve_ocr(config)?;
            decode_ocr_bytes(&ocr.recognize(resolved.path()).await?)
        }
        SourceKind::Text => {
            let bytes = tokio::fs::read(resolved.path())
                .await
                .map_err(|e| ExtractionError::Io {
                    path: resolved.path().to_path_buf(),
                    source: e,
                })?;
            decode_ocr_bytes(&bytes)
        }
        SourceKind::Csv | SourceKind::Spreadsheet => {
            // Rows are already structured; there is no free text to show.
            let path = resolved.path();
            return Err(ExtractionError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: path
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            }
            .into());
        }
    };
    Ok(sanitize(&raw, &config.sanitize))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn finish(items: Vec<MenuItem>, mut stats: ExtractionStats, total_start: Instant) -> ExtractionOutput {
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Extraction complete: {} items, {}ms total",
        items.len(),
        stats.total_duration_ms
    );
    ExtractionOutput { items, stats }
}

/// Read CSV/spreadsheet rows off the async executor.
async fn read_table(path: &Path, kind: SourceKind) -> Result<Vec<Value>, MenuError> {
    let path = path.to_path_buf();
    let rows = tokio::task::spawn_blocking(move || match kind {
        SourceKind::Csv => tabular::read_csv(&path),
        _ => tabular::read_spreadsheet(&path),
    })
    .await
    .map_err(|e| MenuError::Internal(format!("table reader panicked: {e}")))??;
    Ok(rows)
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), MenuError> {
    let write_err = |e| MenuError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}

/// Resolve the completion backend, from most-specific to least-specific.
fn resolve_backend(config: &ExtractionConfig) -> Result<Arc<dyn CompletionBackend>, MenuError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }
    let (provider, label) = resolve_provider(config)?;
    Ok(Arc::new(LlmBackend::new(provider, label)))
}

fn resolve_ocr(config: &ExtractionConfig) -> Result<Arc<dyn OcrEngine>, MenuError> {
    if let Some(ref engine) = config.ocr_engine {
        return Ok(Arc::clone(engine));
    }
    match config.ocr {
        OcrBackendKind::Tesseract => Ok(Arc::new(TesseractOcr::with_binary(
            config.tesseract_bin.clone(),
        ))),
        OcrBackendKind::Vision => {
            let (provider, label) = resolve_provider(config)?;
            let mut engine = VisionOcr::new(provider, label);
            engine.max_pixels = config.max_image_pixels;
            engine.max_tokens = config.max_tokens;
            Ok(Arc::new(engine))
        }
    }
}

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<(Arc<dyn LLMProvider>, String), MenuError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        MenuError::Configuration(format!(
            "provider '{provider_name}' could not be created: {e}\n\
             Check that its API key is set in the environment."
        ))
    })?;
    Ok((provider, format!("{provider_name}/{model}")))
}

/// Resolve the LLM provider and a label for logs.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured even when several API keys are present.
/// 4. **`OPENAI_API_KEY`** with the configured or default model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
fn resolve_provider(config: &ExtractionConfig) -> Result<(Arc<dyn LLMProvider>, String), MenuError> {
    if let Some(ref provider) = config.provider {
        let label = config.model.clone().unwrap_or_else(|| "custom".to_string());
        return Ok((Arc::clone(provider), label));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    if config.model.is_some() {
        warn!("--model is ignored when the provider is auto-detected; set --provider too");
    }
    let (llm_provider, _embedding) = ProviderFactory::from_env().map_err(|e| {
        MenuError::Configuration(format!(
            "No LLM provider could be auto-detected from environment.\n\
             Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
             Error: {e}"
        ))
    })?;

    Ok((llm_provider, "auto".to_string()))
}
