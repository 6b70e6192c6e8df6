//! Completion repair: recover a JSON array from free-form model output.
//!
//! Models asked for "JSON only" still wrap the array in ```` ```json ````
//! fences, prepend "Here is the result:", or append commentary. This module
//! tries, in order:
//!
//! 1. a strict parse of the whole (trimmed) completion;
//! 2. a strict parse of the span from the first `[` to the last `]`;
//! 3. giving up with an empty array.
//!
//! It is a best-effort heuristic, not a JSON repair parser: a truncated or
//! internally malformed array still degrades to empty. It never fails and
//! never inspects fields; that is the normalizer's job.

use crate::output::RecoveryStrategy;
use serde_json::Value;
use tracing::{debug, warn};

/// Candidates recovered from a completion and the step that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub candidates: Vec<Value>,
    pub strategy: RecoveryStrategy,
}

/// Recover the candidate array, discarding which step succeeded.
pub fn recover_array(completion: &str) -> Vec<Value> {
    recover(completion).candidates
}

/// Run the fallback chain over a completion.
pub fn recover(completion: &str) -> Recovered {
    let cleaned = remove_invisible_chars(completion);
    let trimmed = cleaned.trim();

    if let Ok(candidates) = serde_json::from_str::<Vec<Value>>(trimmed) {
        debug!("Completion parsed directly: {} candidates", candidates.len());
        return Recovered {
            candidates,
            strategy: RecoveryStrategy::Direct,
        };
    }

    if let Some(span) = bracket_span(trimmed) {
        if let Ok(candidates) = serde_json::from_str::<Vec<Value>>(span) {
            debug!(
                "Completion parsed from bracket span: {} candidates",
                candidates.len()
            );
            return Recovered {
                candidates,
                strategy: RecoveryStrategy::BracketSpan,
            };
        }
    }

    warn!(
        "Could not recover a JSON array from completion ({} chars); returning no items",
        completion.len()
    );
    Recovered {
        candidates: Vec::new(),
        strategy: RecoveryStrategy::Degraded,
    }
}

/// Greedy span from the first `[` to the last `]`, if they are ordered.
fn bracket_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// BOM and zero-width characters are not whitespace to `trim`, and a leading
/// BOM alone is enough to fail a strict parse.
fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_clean_array_directly() {
        let r = recover(r#"  [{"name":"Idli","price":40}]  "#);
        assert_eq!(r.strategy, RecoveryStrategy::Direct);
        assert_eq!(r.candidates, vec![json!({"name":"Idli","price":40})]);
    }

    #[test]
    fn recovers_from_prose_and_fences() {
        let text = "Here is the result:\n```json\n[{\"name\":\"Vada\",\"price\":30}]\n```\nLet me know!";
        let r = recover(text);
        assert_eq!(r.strategy, RecoveryStrategy::BracketSpan);
        assert_eq!(r.candidates, vec![json!({"name":"Vada","price":30})]);
    }

    #[test]
    fn recovers_array_nested_in_object() {
        let r = recover(r#"{"items": [{"name": "Lassi"}]}"#);
        assert_eq!(r.strategy, RecoveryStrategy::BracketSpan);
        assert_eq!(r.candidates.len(), 1);
    }

    #[test]
    fn strips_byte_order_mark() {
        let r = recover("\u{FEFF}[]");
        assert_eq!(r.strategy, RecoveryStrategy::Direct);
        assert!(r.candidates.is_empty());
    }

    #[test]
    fn empty_and_garbage_degrade_to_empty() {
        for text in ["", "   ", "Sorry, I cannot help with that.", "{\"a\": 1}", "] oops [", "[1, 2,"] {
            let r = recover(text);
            assert_eq!(r.strategy, RecoveryStrategy::Degraded, "input {text:?}");
            assert!(r.candidates.is_empty());
        }
    }

    #[test]
    fn greedy_span_with_trailing_bracket_text_degrades() {
        // The last `]` belongs to commentary, so the greedy span is invalid.
        let text = "[{\"name\":\"Tea\"}] see note [1]";
        assert!(recover_array(text).is_empty());
    }

    #[test]
    fn keeps_non_object_entries_for_the_normalizer() {
        let out = recover_array(r#"[{"name":"Tea"}, 5, "x", null]"#);
        assert_eq!(out.len(), 4);
    }
}
