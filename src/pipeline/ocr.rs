//! OCR engines: turn a menu image into raw text bytes.
//!
//! Two engines ship with the crate:
//!
//! * [`TesseractOcr`] runs the `tesseract` binary (LSTM engine, single
//!   uniform text block) and needs nothing but a local install.
//! * [`VisionOcr`] sends the image to a vision LLM and asks for a plain
//!   transcription. It copes better with photos taken at an angle or under
//!   poor light, at the cost of an extra API call.
//!
//! Both return raw bytes; [`crate::pipeline::sanitize::decode_ocr_bytes`]
//! turns them into text, dropping anything that is not valid UTF-8.

use crate::error::ExtractionError;
use crate::pipeline::encode::{encode_image, fit_within, load_image, probe_image};
use crate::prompts::VISION_OCR_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info};

/// Anything that can read the text out of an image file.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short label used in logs and error messages.
    fn name(&self) -> &str;

    async fn recognize(&self, image: &Path) -> Result<Vec<u8>, ExtractionError>;
}

// ── Tesseract ────────────────────────────────────────────────────────────────

/// OCR via the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    /// Binary to execute. Default: `tesseract` (looked up on `PATH`).
    pub binary: PathBuf,
    /// Traineddata language(s), e.g. `eng` or `eng+hin`. Default: `eng`.
    pub language: String,
    /// OCR engine mode. Default: 3 (whatever is available, LSTM preferred).
    pub oem: u8,
    /// Page segmentation mode. Default: 6 (single uniform block of text),
    /// which keeps a menu row's name and price on the same line.
    pub psm: u8,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            oem: 3,
            psm: 6,
        }
    }
}

impl TesseractOcr {
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            ..Default::default()
        }
    }

    fn failure(&self, detail: impl Into<String>) -> ExtractionError {
        ExtractionError::OcrFailed {
            engine: self.name().to_string(),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &Path) -> Result<Vec<u8>, ExtractionError> {
        // Unreadable images fail as decode errors before tesseract runs.
        let (w, h) = probe_image(image)?;
        debug!("Running tesseract on {} ({}x{})", image.display(), w, h);

        let start = Instant::now();
        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("--oem")
            .arg(self.oem.to_string())
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("-l")
            .arg(&self.language)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    self.failure(format!(
                        "'{}' was not found. Install tesseract-ocr or set --tesseract-bin.",
                        self.binary.display()
                    ))
                } else {
                    self.failure(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!("{}: {}", output.status, stderr.trim())));
        }

        info!(
            "tesseract read {} bytes in {:?}",
            output.stdout.len(),
            start.elapsed()
        );
        Ok(output.stdout)
    }
}

// ── Vision LLM ──────────────────────────────────────────────────────────────

/// OCR by asking a vision-capable LLM to transcribe the image.
pub struct VisionOcr {
    provider: Arc<dyn LLMProvider>,
    label: String,
    /// Longest image edge sent to the API.
    pub max_pixels: u32,
    /// Output budget for the transcription.
    pub max_tokens: usize,
}

impl VisionOcr {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
            max_pixels: 2000,
            max_tokens: 4096,
        }
    }

    fn failure(&self, detail: impl Into<String>) -> ExtractionError {
        ExtractionError::OcrFailed {
            engine: format!("vision:{}", self.label),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for VisionOcr {
    fn name(&self) -> &str {
        "vision"
    }

    async fn recognize(&self, image: &Path) -> Result<Vec<u8>, ExtractionError> {
        let path = image.to_path_buf();
        let max_pixels = self.max_pixels;

        // Decoding and PNG encoding are CPU-bound.
        let image_data = tokio::task::spawn_blocking(move || {
            let img = fit_within(load_image(&path)?, max_pixels);
            encode_image(&img).map_err(|e| ExtractionError::ImageDecode {
                path: path.clone(),
                detail: format!("PNG encoding failed: {e}"),
            })
        })
        .await
        .map_err(|e| self.failure(format!("encode task panicked: {e}")))??;

        let messages = vec![
            ChatMessage::system(VISION_OCR_PROMPT),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let start = Instant::now();
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| self.failure(e.to_string()))?;

        info!(
            "vision OCR read {} chars in {:?}",
            response.content.len(),
            start.elapsed()
        );
        Ok(response.content.into_bytes())
    }
}
