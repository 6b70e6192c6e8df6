//! Pipeline stages for menu-to-JSON extraction.
//!
//! Each submodule implements one transformation step and can be tested on
//! its own. The two external collaborators (OCR and the language model) sit
//! behind traits so the deterministic stages around them are testable
//! without a network or a Tesseract install.
//!
//! ## Data Flow
//!
//! ```text
//!                 ┌─▶ ocr ──▶ sanitize ──▶ prompt ──▶ llm ──▶ recover ─┐
//! input ──▶ kind ─┤  (image)                                          ├─▶ normalize
//! (URL/path)      └─▶ tabular (CSV / spreadsheet rows) ───────────────┘
//! ```
//!
//! 1. [`input`]     — canonicalise the user-supplied path or URL to a local
//!    file and decide its [`crate::output::SourceKind`]
//! 2. [`ocr`]       — image → raw bytes via Tesseract or a vision model;
//!    [`encode`] prepares images for the latter
//! 3. [`sanitize`]  — strip currency markers and repair OCR digit splits
//! 4. [`llm`]       — one completion call; the only stage with network I/O
//!    besides downloads and vision OCR
//! 5. [`recover`]   — pull a JSON array out of whatever the model returned
//! 6. [`normalize`] — coerce each candidate into a complete
//!    [`crate::output::MenuItem`]
//!
//! [`tabular`] sources skip stages 2–5: their rows are already structured.

pub mod encode;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod ocr;
pub mod recover;
pub mod sanitize;
pub mod tabular;
