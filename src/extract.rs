// src/extract.rs
//! Recovery of one JSON object from free-form model output.
//!
//! Precedence:
//! 1) fenced code blocks tagged `json`, in order of appearance; a block that
//!    does not parse (or does not satisfy the mode) falls through;
//! 2) `Discriminator(key)`: every span from a `{` to the *next* `}`, left to
//!    right, first one that parses as an object holding `key` wins;
//! 3) `Span`: the widest span from the first `{` to the last `}`, parsed once.
//!
//! Step 2 does not balance braces, so a discriminated payload that itself
//! contains a nested object is not recovered by the scan (only through a
//! fence). Both scan strategies are kept as explicit modes.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

pub type JsonObject = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode<'a> {
    /// First object (fenced, else first-`}` scan) containing this key.
    Discriminator(&'a str),
    /// Fenced object, else first `{` to last `}`.
    Span,
}

fn fenced_json_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)```[ \t]*json[ \t]*\r?\n(.*?)```").unwrap())
}

fn accepts(value: Value, mode: ExtractMode<'_>) -> Option<JsonObject> {
    match value {
        Value::Object(map) => match mode {
            ExtractMode::Discriminator(key) if !map.contains_key(key) => None,
            _ => Some(map),
        },
        _ => None,
    }
}

/// Interiors of every ```json fenced block, in order.
pub fn fenced_blocks(text: &str) -> Vec<&str> {
    fenced_json_re()
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

fn from_fences(text: &str, mode: ExtractMode<'_>) -> Option<JsonObject> {
    for block in fenced_blocks(text) {
        match serde_json::from_str::<Value>(block.trim()) {
            Ok(v) => {
                if let Some(obj) = accepts(v, mode) {
                    return Some(obj);
                }
                debug!(target: "extract", "fenced block parsed but rejected by mode");
            }
            Err(e) => debug!(target: "extract", error = %e, "fenced block is not valid JSON"),
        }
    }
    None
}

/// Step 2: each `{` paired with the next `}` after it.
fn scan_first_close(text: &str, key: &str) -> Option<JsonObject> {
    for (start, ch) in text.char_indices() {
        if ch != '{' {
            continue;
        }
        let Some(rel_end) = text[start..].find('}') else {
            break;
        };
        let candidate = &text[start..=start + rel_end];
        if let Ok(v) = serde_json::from_str::<Value>(candidate) {
            if let Some(obj) = accepts(v, ExtractMode::Discriminator(key)) {
                return Some(obj);
            }
        }
    }
    None
}

/// Step 3: the widest `{ ... }` span.
fn widest_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Extract the intended object or fail with `ExtractionFailed`.
pub fn extract_object(text: &str, mode: ExtractMode<'_>) -> Result<JsonObject> {
    if let Some(obj) = from_fences(text, mode) {
        return Ok(obj);
    }

    match mode {
        ExtractMode::Discriminator(key) => scan_first_close(text, key).ok_or_else(|| {
            let offending = text.find('{').map(|i| &text[i..]).unwrap_or(text);
            PipelineError::extraction_failed(offending)
        }),
        ExtractMode::Span => {
            let span = widest_span(text).ok_or_else(|| PipelineError::extraction_failed(text))?;
            serde_json::from_str::<Value>(span)
                .ok()
                .and_then(|v| accepts(v, ExtractMode::Span))
                .ok_or_else(|| PipelineError::extraction_failed(span))
        }
    }
}

/// Tolerant variant for callers that own a safe default.
pub fn extract_object_or(text: &str, mode: ExtractMode<'_>, fallback: JsonObject) -> JsonObject {
    match extract_object(text, mode) {
        Ok(obj) => obj,
        Err(e) => {
            warn!(target: "extract", error = %e, "extraction failed, using fallback");
            fallback
        }
    }
}
