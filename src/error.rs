//! Error types for the menu2json library.
//!
//! Failures fall into three fatal families plus one deliberate non-error:
//!
//! * [`ExtractionError`] — the source document could not be read, decoded,
//!   or OCR'd. No partial data is produced.
//! * [`ModelError`] — the language-model call failed (transport, auth,
//!   quota, timeout). No partial data is produced.
//! * [`MenuError::Configuration`] — raised by
//!   [`crate::extract::MenuExtractor::new`] before any document is touched,
//!   e.g. when no provider credential is available.
//!
//! An unparseable completion is **not** an error: recovery degrades to an
//! empty item list and records [`crate::output::RecoveryStrategy::Degraded`]
//! in the stats. Malformed individual records are repaired or dropped by the
//! normalizer and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the menu2json library.
#[derive(Debug, Error)]
pub enum MenuError {
    /// The source document could not be read or turned into text.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The language-model call failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Provider or builder configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The source document could not be read or decoded.
#[derive(Debug, Error)]
pub enum ExtractionError {
    // ── Input errors ──────────────────────────────────────────────────────
    #[error("Menu file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// File extension is not one of the supported image/table/text formats.
    #[error(
        "Unsupported file type '{extension}' for '{path}'\n\
Supported: png, jpg, jpeg, csv, xlsx, xlsm, xls, ods, txt"
    )]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The extension claims an image but the leading bytes disagree.
    #[error("File is not a valid {expected} image: '{path}'\nFirst bytes: {magic:?}")]
    NotAnImage {
        path: PathBuf,
        expected: &'static str,
        magic: [u8; 4],
    },

    // ── Decode errors ─────────────────────────────────────────────────────
    #[error("Could not decode image '{path}': {detail}")]
    ImageDecode { path: PathBuf, detail: String },

    /// The OCR engine ran but failed (missing binary, non-zero exit, API error).
    #[error("OCR extraction error ({engine}): {detail}")]
    OcrFailed { engine: String, detail: String },

    /// CSV or spreadsheet could not be parsed.
    #[error("Failed to read table '{path}': {detail}")]
    TableRead { path: PathBuf, detail: String },

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The external language-model call failed.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The provider returned a non-retryable error.
    #[error("LLM API error from '{provider}': {message}")]
    Api { provider: String, message: String },

    /// HTTP 401/403 or an invalid key; retrying will not help.
    #[error("Authentication error from provider '{provider}': {detail}")]
    Auth { provider: String, detail: String },

    /// HTTP 429 or quota exhaustion; callers may back off and retry.
    #[error("Rate limit exceeded for provider '{provider}': {detail}")]
    RateLimited { provider: String, detail: String },

    /// The call did not complete within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl ModelError {
    /// Classify a provider error message into the matching variant.
    ///
    /// Providers report failures as free-form text, so this looks for the
    /// status codes and phrases they use for auth and quota problems.
    pub fn from_provider_message(provider: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let provider = provider.to_string();

        if lower.contains("429") || lower.contains("rate limit") || lower.contains("quota") {
            ModelError::RateLimited {
                provider,
                detail: message,
            }
        } else if lower.contains("401")
            || lower.contains("403")
            || lower.contains("unauthorized")
            || lower.contains("invalid api key")
            || lower.contains("authentication")
        {
            ModelError::Auth {
                provider,
                detail: message,
            }
        } else {
            ModelError::Api { provider, message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_error_is_transparent() {
        let e: MenuError = ExtractionError::OcrFailed {
            engine: "tesseract".into(),
            detail: "exit status 1".into(),
        }
        .into();
        let msg = e.to_string();
        assert!(msg.starts_with("OCR extraction error"), "got: {msg}");
        assert!(msg.contains("tesseract"));
    }

    #[test]
    fn timeout_display() {
        let e = ModelError::Timeout { secs: 30 };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn classify_rate_limit() {
        let e = ModelError::from_provider_message("groq", "HTTP 429 Too Many Requests");
        assert!(matches!(e, ModelError::RateLimited { .. }));
    }

    #[test]
    fn classify_auth() {
        let e = ModelError::from_provider_message("openai", "401 Unauthorized: Invalid API key");
        assert!(matches!(e, ModelError::Auth { .. }));
        assert!(e.to_string().contains("openai"));
    }

    #[test]
    fn classify_other() {
        let e = ModelError::from_provider_message("anthropic", "connection reset by peer");
        match e {
            ModelError::Api { provider, message } => {
                assert_eq!(provider, "anthropic");
                assert!(message.contains("connection reset"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn unsupported_format_lists_extensions() {
        let e = ExtractionError::UnsupportedFormat {
            path: PathBuf::from("menu.pdf"),
            extension: "pdf".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("'pdf'"));
        assert!(msg.contains("csv"));
    }
}
