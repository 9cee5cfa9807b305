//! Map the provider's JSON answer onto [`AiResult`].
//!
//! The provider is asked for `{htmlContent, seo: {...}}` but nothing is
//! trusted: missing or mistyped fields become empty strings.

use serde_json::{Map, Value};

use crate::models::AiResult;

fn text_field(obj: Option<&Map<String, Value>>, key: &str) -> String {
    match obj.and_then(|o| o.get(key)) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// `synonyms` may arrive as a string or as an array of strings.
fn synonyms_field(seo: Option<&Map<String, Value>>) -> String {
    match seo.and_then(|o| o.get("synonyms")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

pub fn normalize(raw: Value) -> AiResult {
    let root = raw.as_object();
    let seo = root.and_then(|o| o.get("seo")).and_then(Value::as_object);

    AiResult {
        title: text_field(seo, "seoTitle"),
        content_html: text_field(root, "htmlContent"),
        meta_description: text_field(seo, "metaDescription"),
        focus_keyphrase: text_field(seo, "focusKeyphrase"),
        long_tail_keyword: text_field(seo, "longTailKeyword"),
        slug: text_field(seo, "slug"),
        image_alt: text_field(seo, "imageAlt"),
        synonyms: synonyms_field(seo),
        raw_json: raw,
    }
}
