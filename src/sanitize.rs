// src/sanitize.rs
//! Fill required-but-missing article fields with safe defaults.

use serde_json::Value;

use crate::extract::JsonObject;

/// Required article fields and the value used when a field is unusable.
pub const ARTICLE_DEFAULTS: &[(&str, &str)] = &[
    ("title", "Untitled Article"),
    ("slug", "untitled-article"),
    ("excerpt", "This is an auto-generated excerpt."),
    ("content_html", "<p>No content provided.</p>"),
];

/// Returns a copy of `input` where every field named in `defaults` is a
/// trimmed, non-empty string. Fields that are absent, not strings, or blank
/// after trimming get the default. Other fields are kept verbatim.
pub fn sanitize_payload(input: &JsonObject, defaults: &[(&str, &str)]) -> JsonObject {
    let mut out = input.clone();
    for (key, default) in defaults {
        let cleaned = match input.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => (*default).to_string(),
        };
        out.insert((*key).to_string(), Value::String(cleaned));
    }
    out
}

/// `sanitize_payload` with the article table.
pub fn sanitize_article(input: &JsonObject) -> JsonObject {
    sanitize_payload(input, ARTICLE_DEFAULTS)
}
