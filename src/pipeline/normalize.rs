//! Record normalizer: turn raw candidates into complete [`MenuItem`]s.
//!
//! Candidates come either from a model completion (via
//! [`crate::pipeline::recover`]) or from tabular rows (via
//! [`crate::pipeline::tabular`]). Neither source is trusted: fields may be
//! missing, `null`, differently named, or hold prices like `"₹250"`.
//!
//! Each candidate is handled independently and the function is total:
//! objects always become exactly one item, anything else is dropped.

use crate::output::{MenuItem, Price, UNCATEGORIZED};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

// Accepted spellings per field, compared after lowercasing and removing
// `_`, `-` and spaces. Earlier entries win when several are present.
const CATEGORY_KEYS: &[&str] = &["category", "section"];
const SUB_CATEGORY_KEYS: &[&str] = &["subcategory"];
const NAME_KEYS: &[&str] = &["name", "item", "itemname", "dish"];
const DESCRIPTION_KEYS: &[&str] = &["description", "desc"];
const PRICE_KEYS: &[&str] = &["price", "cost", "rate"];

/// Normalize every candidate, silently dropping non-objects.
pub fn normalize(candidates: Vec<Value>) -> Vec<MenuItem> {
    normalize_with_report(candidates).0
}

/// Like [`normalize`], also returning how many candidates were dropped.
pub fn normalize_with_report(candidates: Vec<Value>) -> (Vec<MenuItem>, usize) {
    let total = candidates.len();
    let items: Vec<MenuItem> = candidates.iter().filter_map(normalize_candidate).collect();
    let dropped = total - items.len();
    if dropped > 0 {
        debug!("Dropped {dropped}/{total} candidates that were not JSON objects");
    }
    (items, dropped)
}

/// Normalize a single candidate; `None` when it is not a JSON object.
pub fn normalize_candidate(candidate: &Value) -> Option<MenuItem> {
    let map = candidate.as_object()?;

    let category = text_field(map, CATEGORY_KEYS)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| UNCATEGORIZED.to_string());

    Some(MenuItem {
        category,
        sub_category: text_field(map, SUB_CATEGORY_KEYS).unwrap_or_default(),
        name: text_field(map, NAME_KEYS).unwrap_or_default(),
        description: text_field(map, DESCRIPTION_KEYS).unwrap_or_default(),
        price: field(map, PRICE_KEYS).map(parse_price).unwrap_or_default(),
    })
}

// ── Price extraction ────────────────────────────────────────────────────────

static RE_PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("price regex is valid"));

/// Extract a numeric price from any JSON value.
///
/// The value is stringified and the first run of digits (with at most one
/// decimal part) is taken: integer without a decimal point, float with one,
/// `0` when there are no digits at all. Currency text around the number is
/// ignored.
pub fn parse_price(value: &Value) -> Price {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Null | Value::Bool(_) => return Price::default(),
        other => other.to_string(),
    };

    let Some(m) = RE_PRICE.find(&text) else {
        return Price::default();
    };
    let digits = m.as_str();

    if digits.contains('.') {
        return finite_float(digits);
    }
    match digits.parse::<i64>() {
        Ok(v) => Price::Int(v),
        // Longer than i64; keep the magnitude rather than reporting zero.
        Err(_) => finite_float(digits),
    }
}

// JSON has no infinity; serde_json would write `null` for it.
fn finite_float(digits: &str) -> Price {
    digits
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Price::Float)
        .unwrap_or_default()
}

// ── Field lookup ────────────────────────────────────────────────────────────

fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

fn field<'a>(map: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        map.iter()
            .find(|(k, _)| canonical_key(k) == *alias)
            .map(|(_, v)| v)
    })
}

fn text_field(map: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    match field(map, aliases)? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn price_from_numbers_and_strings() {
        assert_eq!(parse_price(&json!(250)), Price::Int(250));
        assert_eq!(parse_price(&json!(12.5)), Price::Float(12.5));
        assert_eq!(parse_price(&json!("₹250")), Price::Int(250));
        assert_eq!(parse_price(&json!("Rs. 250")), Price::Int(250));
        assert_eq!(parse_price(&json!("INR 99.50 only")), Price::Float(99.5));
        assert_eq!(parse_price(&json!("Half 200 / Full 350")), Price::Int(200));
    }

    #[test]
    fn price_defaults_to_zero() {
        for v in [json!(null), json!(""), json!("market price"), json!(true), json!({}), json!([])] {
            assert_eq!(parse_price(&v), Price::Int(0), "value {v}");
        }
    }

    #[test]
    fn oversized_integer_price_becomes_float() {
        let p = parse_price(&json!("99999999999999999999"));
        assert!(matches!(p, Price::Float(v) if v > 9.0e18));
    }

    #[test]
    fn overflowing_price_serializes_as_zero_not_null() {
        let huge = "9".repeat(400);
        let items = normalize(vec![
            json!({"name": "X", "price": huge.clone()}),
            json!({"name": "Y", "price": format!("{huge}.5")}),
        ]);
        for item in &items {
            assert_eq!(item.price, Price::Int(0));
            let v = serde_json::to_value(item).unwrap();
            assert!(v["price"].is_number(), "price was {}", v["price"]);
        }
    }

    #[test]
    fn fills_missing_fields() {
        let items = normalize(vec![json!({"category": "SOUP", "name": "Manchow", "price": 90})]);
        assert_eq!(
            items,
            vec![MenuItem {
                category: "SOUP".into(),
                sub_category: String::new(),
                name: "Manchow".into(),
                description: String::new(),
                price: Price::Int(90),
            }]
        );
    }

    #[test]
    fn missing_or_null_category_is_uncategorized() {
        let items = normalize(vec![
            json!({"name": "Tea", "price": "20"}),
            json!({"category": null, "name": "Coffee"}),
            json!({"category": "  ", "name": "Juice"}),
        ]);
        assert!(items.iter().all(|i| i.category == UNCATEGORIZED));
        assert_eq!(items[1].price, Price::Int(0));
    }

    #[test]
    fn every_item_has_exactly_five_keys() {
        let items = normalize(vec![json!({"name": "Idli", "extra": "ignored"}), json!({})]);
        for item in items {
            let v = serde_json::to_value(&item).unwrap();
            let obj = v.as_object().unwrap();
            assert_eq!(obj.len(), 5);
            assert!(obj["category"].is_string());
            assert!(obj["subCategory"].is_string());
            assert!(obj["name"].is_string());
            assert!(obj["description"].is_string());
            assert!(obj["price"].is_number());
        }
    }

    #[test]
    fn trims_text_and_stringifies_scalars() {
        let items = normalize(vec![json!({"name": "  Chicken 65 ", "description": 6, "price": 180})]);
        assert_eq!(items[0].name, "Chicken 65");
        assert_eq!(items[0].description, "6");
    }

    #[test]
    fn accepts_key_aliases() {
        let items = normalize(vec![json!({
            "Category": "ROLLS",
            "sub_category": "Egg",
            "Item Name": "Kathi Roll",
            "desc": "Double egg",
            "Cost": "₹ 120"
        })]);
        assert_eq!(items[0].category, "ROLLS");
        assert_eq!(items[0].sub_category, "Egg");
        assert_eq!(items[0].name, "Kathi Roll");
        assert_eq!(items[0].description, "Double egg");
        assert_eq!(items[0].price, Price::Int(120));
    }

    #[test]
    fn drops_non_objects() {
        let (items, dropped) = normalize_with_report(vec![
            json!(1),
            json!("Paneer"),
            json!(null),
            json!([{"name": "nested"}]),
            json!({"name": "Kulfi", "price": 60}),
        ]);
        assert_eq!(items.len(), 1);
        assert_eq!(dropped, 4);
        assert_eq!(items[0].name, "Kulfi");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(normalize(Vec::new()).is_empty());
    }
}
