// src/error.rs
//! Error taxonomy shared by the extraction, image and orchestration layers.

use thiserror::Error;

/// Max characters of raw model/API text carried inside an error or log line.
pub const PREVIEW_CHARS: usize = 300;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// No parseable structured payload found in generation output.
    #[error("no structured payload found in model output: {preview}")]
    ExtractionFailed { preview: String },

    /// The image provider refused the call because the quota is exhausted.
    #[error("image provider rate limited: {0}")]
    RateLimited(String),

    /// Upload succeeded but the response carried no usable URL.
    #[error("upload of {filename} returned no resolvable URL")]
    UploadIncomplete { filename: String },

    #[error("publish failed: {0}")]
    PublishFailed(String),

    #[error("text generation failed: {0}")]
    Generation(String),

    #[error("search failed: {0}")]
    Search(String),

    #[error("image generation failed: {0}")]
    ImageGeneration(String),

    #[error("media upload failed: {0}")]
    Upload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn extraction_failed(raw: &str) -> Self {
        Self::ExtractionFailed {
            preview: preview(raw),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Bounded, single-line preview of arbitrary text for diagnostics.
pub fn preview(raw: &str) -> String {
    let flat: String = raw
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let flat = flat.trim();
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat.to_string();
    }
    let mut out: String = flat.chars().take(PREVIEW_CHARS).collect();
    out.push('…');
    out
}
