// src/collab/mod.rs
//! External collaborators: each is an opaque, fallible, typed service.

pub mod local;
pub mod openai;
pub mod tavily;
pub mod wordpress;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// System-side framing for a generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleContext {
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: String,
}

impl RoleContext {
    pub fn system_prompt(&self) -> String {
        format!(
            "You are the {}.\nGoal: {}\n{}",
            self.role, self.goal, self.backstory
        )
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Free-form text; may be prose-wrapped or malformed.
    async fn generate(&self, role: &RoleContext, instructions: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Ranked best-first.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Base64-encoded image bytes (no `data:` prefix).
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub id: Option<u64>,
    /// Absent on partial success.
    pub url: Option<String>,
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, image_bytes: Vec<u8>, filename: &str) -> Result<UploadedMedia>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest<'a> {
    pub title: &'a str,
    pub content_html: &'a str,
    pub slug: &'a str,
    pub excerpt: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    pub id: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub link: String,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// One attempt, no retry.
    async fn publish(&self, req: PublishRequest<'_>) -> Result<PublishResponse>;
}

#[async_trait]
pub trait FeaturedMedia: Send + Sync {
    /// Mark uploaded media as the post's featured image.
    async fn set_featured_media(&self, post_id: u64, media_id: u64) -> Result<()>;
}

/// Search stand-in when no search key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSearch;

#[async_trait]
impl WebSearch for NoSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>> {
        Ok(Vec::new())
    }
}
