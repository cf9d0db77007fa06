// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod article;
pub mod collab;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod generation;
pub mod images;
pub mod pipeline;
pub mod prompts;
pub mod publish;
pub mod rate_limit;
pub mod sanitize;
pub mod store;
pub mod topic;

// ---- Re-exports for stable public API ----
pub use crate::article::{slugify, ArticlePayload};
pub use crate::config::PipelineConfig;
pub use crate::error::{PipelineError, Result};
pub use crate::events::{PipelineEvent, PipelineObserver, Stage};
pub use crate::extract::{extract_object, extract_object_or, ExtractMode, JsonObject};
pub use crate::images::inject_images;
pub use crate::pipeline::{Collaborators, GeneratedArticle, PipelineOrchestrator, RunError, RunReport};
pub use crate::rate_limit::RateLimiter;
pub use crate::sanitize::sanitize_payload;
pub use crate::topic::{TopicSelection, TopicSelector};
