//! # menu2json
//!
//! Turn restaurant menus (photos, scans, CSV exports, spreadsheets) into a
//! structured list of menu items.
//!
//! Printed menus mix section headings, variant columns (Veg / Chicken /
//! Mixed), portion sizes (Half / Full) and prices with stray currency
//! symbols. OCR alone gives a wall of text; this crate cleans that text,
//! asks a language model to structure it, and then repairs whatever the
//! model returns until every record has the same five fields.
//!
//! ## Pipeline Overview
//!
//! ```text
//! menu.jpg / menu.csv / URL
//!  │
//!  ├─ 1. Input      resolve local file or download from URL; detect kind
//!  ├─ 2. OCR        tesseract or a vision model (images only)
//!  ├─ 3. Sanitize   drop ₹ / Rs / INR / $, rejoin "2 5 0" → "250"
//!  ├─ 4. Prompt     fixed instructions + worked examples + the text
//!  ├─ 5. Model      one completion call, bounded by a timeout
//!  ├─ 6. Recover    whole-text JSON, else the [ … ] span, else []
//!  └─ 7. Normalize  exactly {category, subCategory, name, description, price}
//! ```
//!
//! CSV and spreadsheet rows skip steps 2–6 and go straight to normalization.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use menu2json::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let output = extract("menu.jpg", &config).await?;
//!     for item in &output.items {
//!         println!("{} / {} : {}", item.category, item.name, item.price);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `menu2json` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! menu2json = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, OcrBackendKind};
pub use error::{ExtractionError, MenuError, ModelError};
pub use extract::{
    extract, extract_batch, extract_sync, extract_to_file, sanitized_text, MenuExtractor,
};
pub use output::{
    Envelope, ExtractionOutput, ExtractionStats, MenuItem, Price, RecoveryStrategy, SourceKind,
    Status,
};
pub use pipeline::llm::{Completion, CompletionBackend, CompletionRequest, LlmBackend};
pub use pipeline::normalize::normalize;
pub use pipeline::ocr::{OcrEngine, TesseractOcr, VisionOcr};
pub use pipeline::recover::recover_array;
pub use pipeline::sanitize::{sanitize, sanitize_default, SanitizeOptions};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{build_prompt, build_prompt_with};
