//! Text sanitizer: strip currency noise and repair split digits in OCR text.
//!
//! Tesseract reads printed menus well but makes two systematic mistakes
//! around prices: currency markers survive as stray tokens (`₹`, `Rs.`,
//! `INR`, `$`), and digits get separated by spurious spaces (`2 5 0`).
//! Both confuse the model's price extraction, so they are fixed here before
//! the prompt is built.
//!
//! Split digits are merged only across spaces and tabs. A price at the end
//! of one line is never fused with a number at the start of the next, even
//! though that is also "two digits separated by whitespace".
//!
//! Every rule only ever removes characters, so repeating the passes until
//! nothing changes terminates, and the result is a fixpoint:
//! `sanitize(sanitize(x)) == sanitize(x)`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Tunable sanitizer rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Drop a lone `2` or `7` token that directly precedes a multi-digit
    /// price (`"2 250"` → `"250"`). OCR sometimes reads the rupee glyph as
    /// one of those digits, but the rule also eats real quantities such as
    /// `"Pack of 2 200"`, so it is off unless asked for.
    pub strip_leading_digit: bool,
}

/// Sanitize raw OCR text with the given options.
pub fn sanitize(raw: &str, options: &SanitizeOptions) -> String {
    let mut current = raw.to_string();
    loop {
        let next = sanitize_pass(&current, options);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Sanitize with default options (leading-digit heuristic off).
pub fn sanitize_default(raw: &str) -> String {
    sanitize(raw, &SanitizeOptions::default())
}

/// Decode OCR output bytes, silently dropping invalid UTF-8 sequences.
pub fn decode_ocr_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

fn sanitize_pass(input: &str, options: &SanitizeOptions) -> String {
    let s = strip_currency(input);
    let s = if options.strip_leading_digit {
        strip_leading_digit(&s)
    } else {
        s
    };
    merge_split_digits(&s)
}

// ── Rule 1: Currency markers ─────────────────────────────────────────────────
//
// Word tokens (`Rs`, `INR`) are removed when they stand alone, when they
// are glued to the front of a price (`Rs250`) or when they are glued to the
// end of one (`250Rs`). Inside a word ("Burgers", "Mrs.") they stay. The
// digit on the glued side is captured and put back.

static RE_CURRENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:(?:₹|\$|\b(?:rs|inr)\b\.?)\s*|\b(?:rs|inr)([0-9])|([0-9])(?:rs|inr)\b\.?)",
    )
    .expect("currency regex is valid")
});

fn strip_currency(input: &str) -> String {
    RE_CURRENCY.replace_all(input, "${1}${2}").into_owned()
}

// ── Rule 2: Lone leading 2/7 before a price (opt-in) ─────────────────────────

static RE_LEADING_DIGIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[27][^\S\r\n]+([0-9]{2,})").expect("leading-digit regex is valid")
});

fn strip_leading_digit(input: &str) -> String {
    RE_LEADING_DIGIT.replace_all(input, "${1}").into_owned()
}

// ── Rule 3: Digits split by horizontal whitespace ────────────────────────────
//
// `replace_all` does not overlap matches, so "2 5 0" becomes "25 0" after one
// sweep; keep sweeping until the pattern is gone. Newlines are not treated as
// splits so a price at the end of one line never fuses with a number that
// starts the next.

static RE_SPLIT_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9])[^\S\r\n]+([0-9])").expect("split-digit regex is valid"));

fn merge_split_digits(input: &str) -> String {
    let mut s = input.to_string();
    while RE_SPLIT_DIGITS.is_match(&s) {
        s = RE_SPLIT_DIGITS.replace_all(&s, "${1}${2}").into_owned();
    }
    s
}
