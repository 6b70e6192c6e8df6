//! Prompts for menu extraction and vision OCR.
//!
//! Every instruction the model sees lives here so that prompt changes are
//! made in exactly one place and unit tests can inspect the text without a
//! live provider.
//!
//! The rules are contracts the model is *asked* to honour. Nothing
//! downstream trusts them: [`crate::pipeline::recover`] tolerates prose and
//! fences around the array and [`crate::pipeline::normalize`] fills in
//! missing fields and coerces prices.

/// Placeholder replaced by the sanitized menu text in a custom template.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// First system message sent with every extraction request.
pub const MENU_ASSISTANT_ROLE: &str = "You are a restaurant menu extraction assistant.";

/// Second system message; repeats the output contract in isolation.
pub const JSON_ONLY_REMINDER: &str = "Always return valid JSON array only, nothing else.";

/// Default extraction instructions. The sanitized text is appended after the
/// final `Text:` line by [`build_prompt`].
pub const MENU_EXTRACTION_PROMPT: &str = r#"Extract menu items from the following text and return them as a JSON array.

Schema:
[
  {
    "category": "string",
    "subCategory": "string",
    "name": "string",
    "description": "string",
    "price": number
  }
]

Rules:
- Output valid JSON only, no extra text.
- Always return an array. If no items are found, return [].
- Every object must include all five fields: category, subCategory, name, description, price.
- Keep original casing for name, trim whitespace.

Categories & Subcategories:
- Use explicit section headings (like "SOUP", "NOODLES", "Starters") as category.
- If no category is found, use "Uncategorized".
- If nested headings appear (e.g. "Main Course" then "Vegetarian"), the outer heading goes in category and the inner heading goes in subCategory.
- If the item has options like Veg/Chicken/Mixed, use these as subCategory.
- If no subCategory is found, use "".
- Ignore non-menu text like "Welcome", "Contact", "About Us", phone numbers and addresses.

Item Detection:
- Items may appear in formats such as:
  • Name – Description 250
  • Name 250
  • Name (line 1), Description (line 2), Price (line 3)
  • Table rows: | Name | Description | 250 |
  • Bullets: • Item Name – Description 300
- Merge consecutive lines until a new item, heading, or blank line.

Prices:
- price must be numeric only: no currency symbols, no quotes.
- Ignore ₹, Rs, INR, $, etc.
- If a number like 2 or 7 appears before a price (e.g. 2 250), treat the second number as the price.
- If multiple prices exist for size variants (e.g. small/large), pick the first numeric price unless the variants are listed as separate portions.

Descriptions:
- Put portion details like "Half", "Full", "6 Pc", "8 Pc", "Portion" in description.
- Otherwise use the text after a separator (–, —, -, :, parentheses).
- If none present, use "".

Examples:
Input: "Hakka Noodles Veg 110, Chicken 130, Mixed 150"
Output:
[
  {"category":"NOODLES","subCategory":"Veg","name":"Hakka Noodles","description":"","price":110},
  {"category":"NOODLES","subCategory":"Chicken","name":"Hakka Noodles","description":"","price":130},
  {"category":"NOODLES","subCategory":"Mixed","name":"Hakka Noodles","description":"","price":150}
]

Input: "Butter Chicken (Half 200 / Full 350)"
Output:
[
  {"category":"MAIN COURSE","subCategory":"","name":"Butter Chicken","description":"Half","price":200},
  {"category":"MAIN COURSE","subCategory":"","name":"Butter Chicken","description":"Full","price":350}
]

Input: "Chicken Drums of Heaven (6Pc 200)"
Output:
[
  {"category":"CHICKEN DRY","subCategory":"","name":"Chicken Drums of Heaven","description":"6 Pc","price":200}
]

Final Requirement:
Return a single JSON array of all menu items following the schema.
Do not output explanations, comments, markdown fences, or extra keys."#;

/// System prompt for [`crate::pipeline::ocr::VisionOcr`].
///
/// The vision model only transcribes; structuring happens in the normal
/// text pipeline so both OCR engines feed identical downstream stages.
pub const VISION_OCR_PROMPT: &str = r#"You are an OCR engine. Transcribe all text visible in this restaurant menu image exactly as printed.

Rules:
- Preserve line breaks and the reading order a customer would use.
- Keep section headings on their own lines.
- Keep prices next to the item they belong to.
- Do NOT translate, summarise, or correct spelling.
- Do NOT add commentary, markdown, or fences. Output plain text only."#;

/// Build the extraction prompt for the default template.
///
/// Deterministic: identical input always yields an identical prompt.
pub fn build_prompt(sanitized_text: &str) -> String {
    format!("{MENU_EXTRACTION_PROMPT}\n\nText:\n{sanitized_text}")
}

/// Build a prompt from a caller-supplied template.
///
/// Templates containing [`TEXT_PLACEHOLDER`] have it replaced; otherwise the
/// text is appended after a `Text:` line the same way [`build_prompt`] does.
pub fn build_prompt_with(template: &str, sanitized_text: &str) -> String {
    if template.contains(TEXT_PLACEHOLDER) {
        template.replace(TEXT_PLACEHOLDER, sanitized_text)
    } else {
        format!("{}\n\nText:\n{}", template.trim_end(), sanitized_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_schema_fields() {
        let p = build_prompt("Masala Dosa 80");
        for field in ["\"category\"", "\"subCategory\"", "\"name\"", "\"description\"", "\"price\""] {
            assert!(p.contains(field), "missing {field}");
        }
    }

    #[test]
    fn prompt_encodes_extraction_rules() {
        let p = build_prompt("");
        assert!(p.contains("Output valid JSON only"));
        assert!(p.contains("\"Uncategorized\""));
        assert!(p.contains("inner heading goes in subCategory"));
        assert!(p.contains("2 250"));
        assert!(p.contains("pick the first numeric price"));
        assert!(p.contains("\"About Us\""));
    }

    #[test]
    fn prompt_has_worked_examples() {
        let p = build_prompt("");
        assert_eq!(p.matches("Input: \"").count(), 3);
        assert!(p.contains("Hakka Noodles Veg 110, Chicken 130, Mixed 150"));
    }

    #[test]
    fn text_is_appended_verbatim_at_end() {
        let text = "SOUPS\nManchow ₹ 90\n  Hot & Sour 95  ";
        let p = build_prompt(text);
        assert!(p.ends_with(text));
        assert!(p.contains("\nText:\n"));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(build_prompt("Idli 40"), build_prompt("Idli 40"));
    }

    #[test]
    fn custom_template_with_placeholder() {
        let p = build_prompt_with("Items from: {text} -- JSON please", "Vada 30");
        assert_eq!(p, "Items from: Vada 30 -- JSON please");
    }

    #[test]
    fn custom_template_without_placeholder_appends() {
        let p = build_prompt_with("Return JSON.\n\n", "Vada 30");
        assert_eq!(p, "Return JSON.\n\nText:\nVada 30");
    }
}
