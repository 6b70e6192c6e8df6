//! Output types: menu items, per-document stats, and the response envelope.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category used when the source text gives an item no section heading.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One structured menu entry.
///
/// Every field is always present: missing text fields are `""` (or
/// [`UNCATEGORIZED`] for `category`) and a missing price is `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    /// Section heading, e.g. "NOODLES".
    pub category: String,
    /// Variant axis ("Veg" / "Chicken") or nested heading.
    pub sub_category: String,
    /// Dish name with original casing.
    pub name: String,
    /// Portion or qualifier, e.g. "Half" or "6 Pc".
    pub description: String,
    pub price: Price,
}

/// A numeric price, serialised as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Int(i64),
    Float(f64),
}

impl Default for Price {
    fn default() -> Self {
        Price::Int(0)
    }
}

impl Price {
    /// The price as `f64`, regardless of representation.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Price::Int(v) => v as f64,
            Price::Float(v) => v,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Int(v) => write!(f, "{v}"),
            Price::Float(v) => write!(f, "{v}"),
        }
    }
}

/// What kind of document the input resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// PNG or JPEG photo/scan; goes through OCR and the model.
    Image,
    /// Comma-separated table; rows are normalised directly.
    Csv,
    /// XLSX / XLSM / XLS / ODS workbook; first sheet is normalised directly.
    Spreadsheet,
    /// Plain text that skips OCR but still goes through the model.
    Text,
}

/// Which step of the repair chain produced the candidate array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// The whole completion parsed as a JSON array.
    Direct,
    /// The `[` … `]` span inside the completion parsed.
    BracketSpan,
    /// Nothing parsed; the result is empty.
    Degraded,
}

/// Statistics for a single document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub source_kind: Option<SourceKind>,
    /// Character count of the sanitized text (0 for tabular sources).
    pub sanitized_chars: usize,
    /// Whether the language model was actually called.
    pub model_called: bool,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// `None` when no completion was parsed (tabular input or empty text).
    pub recovery: Option<RecoveryStrategy>,
    /// Candidates discarded because they were not JSON objects.
    pub dropped_candidates: usize,
    pub ocr_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of extracting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub items: Vec<MenuItem>,
    pub stats: ExtractionStats,
}

/// Outcome flag of an [`Envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

/// The JSON document returned to callers of the CLI or a service wrapper.
///
/// `{"status": "success", "data": [...]}` or
/// `{"status": "failure", "data": null, "message": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Status,
    pub data: Option<Vec<MenuItem>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl Envelope {
    pub fn success(items: Vec<MenuItem>) -> Self {
        Self {
            status: Status::Success,
            data: Some(items),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn menu_item_uses_camel_case_keys() {
        let item = MenuItem {
            category: "NOODLES".into(),
            sub_category: "Veg".into(),
            name: "Hakka Noodles".into(),
            description: String::new(),
            price: Price::Int(110),
        };
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(
            v,
            json!({
                "category": "NOODLES",
                "subCategory": "Veg",
                "name": "Hakka Noodles",
                "description": "",
                "price": 110
            })
        );
    }

    #[test]
    fn float_price_serialises_as_number() {
        let v = serde_json::to_value(Price::Float(12.5)).unwrap();
        assert_eq!(v, json!(12.5));
        assert_eq!(Price::Float(12.5).as_f64(), 12.5);
    }

    #[test]
    fn failure_envelope_has_null_data() {
        let v = serde_json::to_value(Envelope::failure("OCR extraction error")).unwrap();
        assert_eq!(v["status"], "failure");
        assert!(v["data"].is_null());
        assert_eq!(v["message"], "OCR extraction error");
    }

    #[test]
    fn success_envelope_omits_message() {
        let v = serde_json::to_value(Envelope::success(vec![])).unwrap();
        assert_eq!(v, json!({"status": "success", "data": []}));
    }
}
