// src/config/mod.rs
//! Pipeline configuration: TOML file + environment overrides.
//! Secrets never live in the file; see [`secrets`].

pub mod secrets;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::rate_limit::{RateLimiter, DEFAULT_MAX_CALLS, DEFAULT_WINDOW_SECS};
use crate::topic::{ContentMode, TopicSelection};

pub use secrets::Secrets;

pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";

pub const ENV_RATE_MAX_CALLS: &str = "PIPELINE_RATE_MAX_CALLS";
pub const ENV_RATE_WINDOW_SECS: &str = "PIPELINE_RATE_WINDOW_SECS";
pub const ENV_OUTPUT_DIR: &str = "PIPELINE_OUTPUT_DIR";
pub const ENV_IMAGE_MOCK: &str = "PIPELINE_IMAGE_MOCK";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_calls: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: DEFAULT_MAX_CALLS,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

impl RateLimitConfig {
    pub fn build(&self) -> RateLimiter {
        RateLimiter::new(self.max_calls, Duration::from_secs(self.window_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where finished articles are saved as `<slug>.json`. Empty disables saving.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/generated_posts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandConfig {
    pub name: String,
    pub contact_email: String,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: "The Technology Fiction".into(),
            contact_email: "thetechfilabs@gmail.com".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalLink {
    pub title: String,
    pub url: String,
    pub anchor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub text: String,
    pub image: String,
    pub image_size: String,
    /// OpenAI-compatible API base; lets a local gateway stand in.
    pub api_base: Option<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            text: "gpt-4.1-mini".into(),
            image: "gpt-image-1".into(),
            image_size: "1536x1024".into(),
            api_base: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Serve `mock_image_path` instead of calling the image provider.
    pub mock: bool,
    pub mock_image_path: PathBuf,
    /// Inject a featured image when publishing a saved article.
    pub hero: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            mock: false,
            mock_image_path: PathBuf::from("data/test_images/sample.png"),
            hero: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordPressConfig {
    pub default_category_id: u64,
    pub default_author_id: u64,
    pub status: String,
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self {
            default_category_id: 1,
            default_author_id: 1,
            status: "draft".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub rate_limit: RateLimitConfig,
    /// The single default topic used whenever topic selection cannot produce one.
    pub fallback_topic: TopicSelection,
    pub output: OutputConfig,
    pub brand: BrandConfig,
    pub internal_links: Vec<InternalLink>,
    pub models: ModelsConfig,
    pub images: ImagesConfig,
    pub wordpress: WordPressConfig,
}

impl PipelineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let cfg: PipelineConfig = toml::from_str(&data)
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Resolution order:
    /// 1) `$PIPELINE_CONFIG_PATH` (must exist)
    /// 2) `config/pipeline.toml`
    /// 3) built-in defaults
    ///
    /// Environment overrides are applied on top in every case.
    pub fn load_default() -> Result<Self> {
        let cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            info!(target: "config", "no pipeline config file, using defaults");
            Self::default()
        };
        Ok(cfg.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<u32>(ENV_RATE_MAX_CALLS) {
            self.rate_limit.max_calls = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_RATE_WINDOW_SECS) {
            self.rate_limit.window_secs = v;
        }
        if let Ok(dir) = std::env::var(ENV_OUTPUT_DIR) {
            self.output.dir = PathBuf::from(dir);
        }
        if let Ok(v) = std::env::var(ENV_IMAGE_MOCK) {
            self.images.mock = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true");
        }
        self.sanitized()
    }

    /// Zero limits fall back to defaults; the fallback topic keeps a keyword
    /// and is always evergreen.
    fn sanitized(mut self) -> Self {
        if self.rate_limit.max_calls == 0 {
            self.rate_limit.max_calls = DEFAULT_MAX_CALLS;
        }
        if self.rate_limit.window_secs == 0 {
            self.rate_limit.window_secs = DEFAULT_WINDOW_SECS;
        }
        if self.fallback_topic.topic.trim().is_empty() {
            self.fallback_topic = TopicSelection::default();
        } else if self.fallback_topic.main_keyword.trim().is_empty() {
            self.fallback_topic.main_keyword = self.fallback_topic.topic.to_lowercase();
        }
        if self.fallback_topic.content_mode != ContentMode::Evergreen {
            warn!(target: "config", "fallback topic must be evergreen, overriding content_mode");
            self.fallback_topic.content_mode = ContentMode::Evergreen;
        }
        self
    }

    /// `None` when saving is disabled.
    pub fn output_dir(&self) -> Option<&Path> {
        let dir = self.output.dir.as_path();
        (!dir.as_os_str().is_empty()).then_some(dir)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: PipelineConfig = toml::from_str(
            r#"
[rate_limit]
max_calls = 5

[[internal_links]]
title = "Flow guide"
url = "https://blog.test/flow"
anchor = "Salesforce Flow guide"
"#,
        )
        .unwrap();
        assert_eq!(cfg.rate_limit.max_calls, 5);
        assert_eq!(cfg.rate_limit.window_secs, DEFAULT_WINDOW_SECS);
        assert_eq!(cfg.internal_links.len(), 1);
        assert_eq!(cfg.fallback_topic, TopicSelection::default());
        assert_eq!(cfg.wordpress.status, "draft");
    }

    #[test]
    fn zero_limits_are_sanitized() {
        let cfg: PipelineConfig =
            toml::from_str("[rate_limit]\nmax_calls = 0\nwindow_secs = 0\n").unwrap();
        let cfg = cfg.sanitized();
        assert_eq!(cfg.rate_limit, RateLimitConfig::default());
    }

    #[test]
    fn empty_output_dir_disables_saving() {
        let mut cfg = PipelineConfig::default();
        assert!(cfg.output_dir().is_some());
        cfg.output.dir = PathBuf::new();
        assert!(cfg.output_dir().is_none());
    }
}
