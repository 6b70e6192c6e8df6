//! Configuration types for menu extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. There is no global client: the
//! provider, model, timeouts and sampling settings all travel with the
//! config, so two extractors with different settings can run side by side.

use crate::error::MenuError;
use crate::pipeline::llm::CompletionBackend;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::sanitize::SanitizeOptions;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Configuration for extracting menu items.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use menu2json::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .provider_name("openai")
///     .model("gpt-4.1-mini")
///     .api_timeout_secs(20)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LLM model identifier, e.g. "gpt-4.1-nano", "llama-3.3-70b-versatile".
    /// If None, uses [`DEFAULT_MODEL`] or the auto-detected provider's default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the environment decides.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed completion backend. Takes precedence over everything
    /// else; tests use it to plug in a mock model.
    pub backend: Option<Arc<dyn CompletionBackend>>,

    /// Which OCR engine reads image inputs. Default: Tesseract.
    pub ocr: OcrBackendKind,

    /// Pre-constructed OCR engine. Takes precedence over `ocr`.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Tesseract binary. Default: `tesseract` on `PATH`.
    pub tesseract_bin: PathBuf,

    /// Sanitizer rules applied to OCR text.
    pub sanitize: SanitizeOptions,

    /// Custom extraction prompt. `{text}` marks where the menu text goes;
    /// without it the text is appended. If None, uses the built-in prompt.
    pub prompt_template: Option<String>,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Low enough to keep the JSON shape stable, high enough that the model
    /// still groups variants sensibly instead of echoing lines verbatim.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// A dense single-page menu produces around 150 items; at roughly 25
    /// tokens per item that is well inside the default.
    pub max_tokens: usize,

    /// Per-model-call timeout in seconds. Default: 30.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Documents processed at once by [`crate::extract::extract_batch`]. Default: 4.
    pub concurrency: usize,

    /// Longest image edge sent to a vision OCR model. Default: 2000.
    pub max_image_pixels: u32,

    /// Optional per-document progress events for batch runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            backend: None,
            ocr: OcrBackendKind::default(),
            ocr_engine: None,
            tesseract_bin: PathBuf::from("tesseract"),
            sanitize: SanitizeOptions::default(),
            prompt_template: None,
            temperature: 0.2,
            max_tokens: 4096,
            api_timeout_secs: 30,
            download_timeout_secs: 120,
            concurrency: 4,
            max_image_pixels: 2000,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("ocr", &self.ocr)
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|e| e.name().to_string()))
            .field("tesseract_bin", &self.tesseract_bin)
            .field("sanitize", &self.sanitize)
            .field("prompt_template", &self.prompt_template.as_ref().map(|t| t.len()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
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

    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn ocr(mut self, kind: OcrBackendKind) -> Self {
        self.config.ocr = kind;
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn tesseract_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_bin = path.into();
        self
    }

    pub fn strip_leading_digit(mut self, v: bool) -> Self {
        self.config.sanitize.strip_leading_digit = v;
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
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

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_image_pixels(mut self, px: u32) -> Self {
        self.config.max_image_pixels = px.max(100);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, MenuError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(MenuError::Configuration(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(MenuError::Configuration(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(MenuError::Configuration(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref template) = c.prompt_template {
            if template.trim().is_empty() {
                return Err(MenuError::Configuration(
                    "Prompt template is empty".into(),
                ));
            }
        }
        if c.tesseract_bin.as_os_str().is_empty() {
            return Err(MenuError::Configuration(
                "Tesseract binary path is empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which OCR engine reads image inputs.
///
/// | Engine | Needs | Best for |
/// |--------|-------|----------|
/// | Tesseract | local `tesseract` install | flat scans, printed menus |
/// | Vision | a vision-capable LLM | phone photos, stylised fonts |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendKind {
    /// Local Tesseract (default).
    #[default]
    Tesseract,
    /// The configured LLM provider, which must accept images.
    Vision,
}

impl std::str::FromStr for OcrBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tesseract" => Ok(OcrBackendKind::Tesseract),
            "vision" | "llm" => Ok(OcrBackendKind::Vision),
            other => Err(format!(
                "unknown OCR engine '{other}' (expected 'tesseract' or 'vision')"
            )),
        }
    }
}
