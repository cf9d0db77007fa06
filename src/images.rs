// src/images.rs
//! Image placeholder resolution for finished article HTML.
//!
//! Markers look like `<!-- IMAGE: flow diagram -->`. Each one is resolved in
//! document order and replaced by a `<figure>` block. A marker whose
//! resolution fails stays in place; the rest of the document is unaffected.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::{general_purpose::STANDARD, Engine};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::collab::{ImageGenerator, MediaUploader};
use crate::error::{PipelineError, Result};
use crate::events::{PipelineEvent, PipelineObserver, Stage};
use crate::prompts::derive_image_prompt;

fn marker_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--\s*IMAGE:\s*(.*?)\s*-->").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlaceholder {
    pub description: String,
    /// Exact marker text as it appears in the document.
    pub marker: String,
}

/// Prompt produced for one placeholder by the image-prompt stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePrompt {
    pub description: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    pub url: String,
    pub media_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedImage {
    pub description: String,
    pub url: String,
    pub media_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedImage {
    pub description: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionOutcome {
    pub content_html: String,
    pub resolved: Vec<ResolvedImage>,
    pub skipped: Vec<SkippedImage>,
}

/// Turns one prompt into a hosted image URL.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve(&self, prompt: &str, filename: &str) -> Result<ResolvedMedia>;
}

/// Generate → decode → upload. Missing URL → `UploadIncomplete`.
pub struct GeneratingResolver {
    images: Arc<dyn ImageGenerator>,
    uploader: Arc<dyn MediaUploader>,
}

impl GeneratingResolver {
    pub fn new(images: Arc<dyn ImageGenerator>, uploader: Arc<dyn MediaUploader>) -> Self {
        Self { images, uploader }
    }
}

#[async_trait]
impl ImageResolver for GeneratingResolver {
    async fn resolve(&self, prompt: &str, filename: &str) -> Result<ResolvedMedia> {
        let b64 = self.images.generate_image(prompt).await?;
        let bytes = STANDARD
            .decode(b64.trim())
            .map_err(|e| PipelineError::ImageGeneration(format!("invalid base64 image: {e}")))?;
        let media = self.uploader.upload(bytes, filename).await?;
        let url = media.url.ok_or_else(|| PipelineError::UploadIncomplete {
            filename: filename.to_string(),
        })?;
        Ok(ResolvedMedia {
            url,
            media_id: media.id,
        })
    }
}

/// All markers in document order.
pub fn find_placeholders(html: &str) -> Vec<ImagePlaceholder> {
    marker_re()
        .captures_iter(html)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let desc = c.get(1)?.as_str().trim();
            Some(ImagePlaceholder {
                description: desc.to_string(),
                marker: whole.as_str().to_string(),
            })
        })
        .collect()
}

/// `<slug>-<8 hex of sha256(description)>.png`
pub fn image_filename(slug: &str, description: &str) -> String {
    let digest = Sha256::digest(description.as_bytes());
    let mut hash = String::with_capacity(8);
    for b in digest.iter().take(4) {
        use std::fmt::Write as _;
        let _ = write!(&mut hash, "{b:02x}");
    }
    format!("{slug}-{hash}.png")
}

pub fn render_figure(url: &str, description: &str) -> String {
    format!(
        "<figure class=\"wp-block-image\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\" /><figcaption>{}</figcaption></figure>",
        html_escape::encode_double_quoted_attribute(url),
        html_escape::encode_double_quoted_attribute(description),
        html_escape::encode_text(description)
    )
}

fn prompt_for(description: &str, prompts: &[ImagePrompt]) -> String {
    prompts
        .iter()
        .find(|p| p.description.trim() == description)
        .or_else(|| {
            prompts
                .iter()
                .find(|p| p.description.trim().eq_ignore_ascii_case(description))
        })
        .map(|p| p.prompt.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| derive_image_prompt(description))
}

/// Resolve every marker in order. Replacement targets the first occurrence
/// of the marker at or after the previous one, so repeated descriptions map
/// 1:1 onto their own markers.
pub async fn inject_images(
    content_html: &str,
    slug: &str,
    prompts: &[ImagePrompt],
    resolver: &dyn ImageResolver,
    observer: &dyn PipelineObserver,
) -> InjectionOutcome {
    let placeholders = find_placeholders(content_html);
    let mut html = content_html.to_string();
    let mut cursor = 0usize;
    let mut resolved = Vec::new();
    let mut skipped = Vec::new();

    for ph in placeholders {
        let Some(rel) = html[cursor..].find(&ph.marker) else {
            continue;
        };
        let pos = cursor + rel;
        let prompt = prompt_for(&ph.description, prompts);
        let filename = image_filename(slug, &ph.description);

        match resolver.resolve(&prompt, &filename).await {
            Ok(media) => {
                let figure = render_figure(&media.url, &ph.description);
                html.replace_range(pos..pos + ph.marker.len(), &figure);
                cursor = pos + figure.len();
                debug!(target: "images", description = %ph.description, url = %media.url, "placeholder resolved");
                counter!("pipeline_images_resolved_total").increment(1);
                resolved.push(ResolvedImage {
                    description: ph.description,
                    url: media.url,
                    media_id: media.media_id,
                });
            }
            Err(e) => {
                cursor = pos + ph.marker.len();
                counter!("pipeline_images_skipped_total").increment(1);
                observer.on_event(&PipelineEvent::ItemSkipped {
                    stage: Stage::ImageResolution,
                    item: ph.description.clone(),
                    reason: e.to_string(),
                });
                skipped.push(SkippedImage {
                    description: ph.description,
                    reason: e.to_string(),
                });
            }
        }
    }

    InjectionOutcome {
        content_html: html,
        resolved,
        skipped,
    }
}

/// Hero image right after the first `</h1>`, or at the top when there is none.
pub fn inject_hero_image(content_html: &str, url: &str, title: &str) -> String {
    let hero = format!(
        "\n<p><img src=\"{}\" alt=\"{}\" loading=\"lazy\" style=\"max-width:100%;height:auto;border-radius:12px;margin:16px 0;\" /></p>\n",
        html_escape::encode_double_quoted_attribute(url),
        html_escape::encode_double_quoted_attribute(title)
    );
    match content_html.to_ascii_lowercase().find("</h1>") {
        Some(idx) => {
            let at = idx + "</h1>".len();
            format!("{}{}{}", &content_html[..at], hero, &content_html[at..])
        }
        None => format!("{hero}{content_html}"),
    }
}
