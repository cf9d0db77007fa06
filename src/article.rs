// src/article.rs
//! Finished article record built from sanitized draft output.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::JsonObject;
use crate::sanitize::sanitize_article;

const FALLBACK_SLUG: &str = "untitled-article";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePayload {
    pub title: String,
    /// URL-safe, produced by [`slugify`].
    pub slug: String,
    /// Also sent as the post excerpt.
    pub meta_description: String,
    /// HTML fragment; may still contain `<!-- IMAGE: ... -->` markers.
    pub content_html: String,
}

fn usable_str(v: Option<&Value>) -> Option<&str> {
    match v {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
        _ => None,
    }
}

impl ArticlePayload {
    /// Build from a draft object. `meta_description` stands in for a missing
    /// `excerpt` before sanitizing, so every field ends up non-empty.
    pub fn from_draft(draft: &JsonObject) -> Self {
        let mut raw = draft.clone();
        if usable_str(raw.get("excerpt")).is_none() {
            if let Some(meta) = usable_str(draft.get("meta_description")) {
                raw.insert("excerpt".into(), Value::String(meta.to_string()));
            }
        }
        let clean = sanitize_article(&raw);
        let field = |k: &str| {
            clean
                .get(k)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let mut slug = slugify(&field("slug"));
        if slug.is_empty() {
            slug = FALLBACK_SLUG.to_string();
        }

        Self {
            title: field("title"),
            slug,
            meta_description: usable_str(draft.get("meta_description"))
                .map(str::to_string)
                .unwrap_or_else(|| field("excerpt")),
            content_html: field("content_html"),
        }
    }
}

/// Lowercase; runs of anything outside `[a-z0-9]` become one `-`; edges trimmed.
pub fn slugify(text: &str) -> String {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap());
    let lower = text.to_lowercase();
    re.replace_all(&lower, "-").trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("  Salesforce Flow vs. Process Builder (2025)! "), "salesforce-flow-vs-process-builder-2025");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn meta_description_feeds_excerpt() {
        let draft = json!({
            "title": "Apex Triggers",
            "slug": "Apex Triggers 101",
            "meta_description": " Learn triggers. ",
            "content_html": "<h1>Apex</h1>"
        });
        let a = ArticlePayload::from_draft(draft.as_object().unwrap());
        assert_eq!(a.slug, "apex-triggers-101");
        assert_eq!(a.meta_description, "Learn triggers.");
    }

    #[test]
    fn empty_draft_gets_defaults() {
        let a = ArticlePayload::from_draft(&JsonObject::new());
        assert_eq!(a.title, "Untitled Article");
        assert_eq!(a.slug, "untitled-article");
        assert_eq!(a.meta_description, "This is an auto-generated excerpt.");
        assert_eq!(a.content_html, "<p>No content provided.</p>");
    }

    #[test]
    fn unsluggable_slug_falls_back() {
        let a = ArticlePayload::from_draft(json!({"slug": "???"}).as_object().unwrap());
        assert_eq!(a.slug, "untitled-article");
    }
}
