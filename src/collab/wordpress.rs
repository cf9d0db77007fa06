// src/collab/wordpress.rs
//! WordPress REST client: media upload, draft publishing, featured media.
//! Auth is HTTP Basic with an application password.

use std::time::Duration;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{
    FeaturedMedia, MediaUploader, PublishRequest, PublishResponse, Publisher, UploadedMedia,
};
use crate::config::WordPressConfig;
use crate::error::{preview, PipelineError, Result};

#[derive(Clone)]
pub struct WordPressClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    app_password: String,
    author_id: u64,
    category_id: u64,
    status: String,
}

impl std::fmt::Debug for WordPressClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordPressClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

impl WordPressClient {
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        app_password: impl Into<String>,
        cfg: &WordPressConfig,
    ) -> AnyResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            anyhow::bail!("WP_BASE_URL is required for publishing");
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building WordPress HTTP client")?;
        Ok(Self {
            http,
            base_url,
            username: username.into(),
            app_password: app_password.into(),
            author_id: cfg.default_author_id,
            category_id: cfg.default_category_id,
            status: cfg.status.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/wp-json/wp/v2/{}", self.base_url, path)
    }
}

/// Pick the most useful URL from a media response:
/// `guid.rendered`, then the largest listed size, then `source_url`.
pub fn best_media_url(media: &Value) -> Option<String> {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    };

    if let Some(url) = non_empty(media.pointer("/guid/rendered")) {
        return Some(url);
    }
    if let Some(sizes) = media.pointer("/media_details/sizes").and_then(Value::as_object) {
        for size in ["full", "large", "medium_large", "medium"] {
            if let Some(url) = non_empty(sizes.get(size).and_then(|s| s.get("source_url"))) {
                return Some(url);
            }
        }
    }
    non_empty(media.get("source_url"))
}

fn content_type_for(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/png"
    }
}

#[async_trait]
impl MediaUploader for WordPressClient {
    async fn upload(&self, image_bytes: Vec<u8>, filename: &str) -> Result<UploadedMedia> {
        let resp = self
            .http
            .post(self.endpoint("media"))
            .basic_auth(&self.username, Some(&self.app_password))
            .header(
                reqwest::header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            )
            .header(reqwest::header::CONTENT_TYPE, content_type_for(filename))
            .body(image_bytes)
            .send()
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;
        if !status.is_success() {
            return Err(PipelineError::Upload(format!("HTTP {status}: {}", preview(&body))));
        }
        let media: Value = serde_json::from_str(&body)?;
        debug!(target: "wordpress", media = %preview(&body), "media uploaded");
        Ok(UploadedMedia {
            id: media.get("id").and_then(Value::as_u64),
            url: best_media_url(&media),
        })
    }
}

#[derive(Serialize)]
struct PostReq<'a> {
    title: &'a str,
    content: &'a str,
    slug: &'a str,
    excerpt: &'a str,
    status: &'a str,
    author: u64,
    categories: [u64; 1],
}

#[async_trait]
impl Publisher for WordPressClient {
    async fn publish(&self, req: PublishRequest<'_>) -> Result<PublishResponse> {
        let payload = PostReq {
            title: req.title,
            content: req.content_html,
            slug: req.slug,
            excerpt: req.excerpt,
            status: &self.status,
            author: self.author_id,
            categories: [self.category_id],
        };
        let resp = self
            .http
            .post(self.endpoint("posts"))
            .basic_auth(&self.username, Some(&self.app_password))
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::PublishFailed(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PipelineError::PublishFailed(e.to_string()))?;
        if !status.is_success() {
            return Err(PipelineError::PublishFailed(format!(
                "HTTP {status}: {}",
                preview(&body)
            )));
        }
        serde_json::from_str(&body).map_err(|e| {
            PipelineError::PublishFailed(format!("unexpected response ({e}): {}", preview(&body)))
        })
    }
}

#[async_trait]
impl FeaturedMedia for WordPressClient {
    async fn set_featured_media(&self, post_id: u64, media_id: u64) -> Result<()> {
        let resp = self
            .http
            .post(self.endpoint(&format!("posts/{post_id}")))
            .basic_auth(&self.username, Some(&self.app_password))
            .json(&serde_json::json!({ "featured_media": media_id }))
            .send()
            .await
            .map_err(|e| PipelineError::PublishFailed(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::PublishFailed(format!(
                "featured media HTTP {status}: {}",
                preview(&body)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn guid_wins_over_sizes() {
        let media = json!({
            "guid": {"rendered": "https://x/orig.png"},
            "media_details": {"sizes": {"full": {"source_url": "https://x/full.png"}}},
            "source_url": "https://x/src.png"
        });
        assert_eq!(best_media_url(&media).as_deref(), Some("https://x/orig.png"));
    }

    #[test]
    fn sizes_follow_priority_then_source_url() {
        let media = json!({
            "guid": {"rendered": ""},
            "media_details": {"sizes": {
                "medium": {"source_url": "https://x/m.png"},
                "large": {"source_url": "https://x/l.png"}
            }}
        });
        assert_eq!(best_media_url(&media).as_deref(), Some("https://x/l.png"));

        let media = json!({"media_details": {"sizes": []}, "source_url": "https://x/s.png"});
        assert_eq!(best_media_url(&media).as_deref(), Some("https://x/s.png"));
    }

    #[test]
    fn missing_url_is_none() {
        assert_eq!(best_media_url(&json!({"id": 7})), None);
    }

    #[test]
    fn publish_response_parses_wp_post() {
        let r: PublishResponse = serde_json::from_str(
            r#"{"id": 12, "status": "draft", "link": "https://blog/?p=12", "title": {"rendered": "x"}}"#,
        )
        .unwrap();
        assert_eq!(r.id, 12);
        assert_eq!(r.status, "draft");
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
    }
}
