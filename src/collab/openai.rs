// src/collab/openai.rs
//! OpenAI chat completions (text) and images (featured/diagram images).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{ImageGenerator, RoleContext, TextGenerator};
use crate::error::{preview, PipelineError, Result};

const API_BASE: &str = "https://api.openai.com/v1";
const USER_AGENT: &str = "blog-pipeline/0.1";

fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .build()
        .context("building OpenAI HTTP client")
}

/// Chat Completions backed generator. Requires an API key.
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> anyhow::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            anyhow::bail!("OPENAI_API_KEY is required for text generation");
        }
        Ok(Self {
            // long-form drafts take a while
            http: http_client(Duration::from_secs(180))?,
            api_key,
            model: model.into(),
            base_url: API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatReq<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, role: &RoleContext, instructions: &str) -> Result<String> {
        let system = role.system_prompt();
        let req = ChatReq {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &system,
                },
                Msg {
                    role: "user",
                    content: instructions,
                },
            ],
            temperature: 0.7,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| PipelineError::Generation(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Generation(format!(
                "HTTP {status}: {}",
                preview(&body)
            )));
        }

        let body: ChatResp = resp
            .json()
            .await
            .map_err(|e| PipelineError::Generation(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| PipelineError::Generation("empty completion".into()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Images API backed generator returning `b64_json`.
pub struct OpenAiImageGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    size: String,
    base_url: String,
}

impl OpenAiImageGenerator {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        size: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            anyhow::bail!("OPENAI_API_KEY is required for image generation");
        }
        Ok(Self {
            http: http_client(Duration::from_secs(120))?,
            api_key,
            model: model.into(),
            size: size.into(),
            base_url: API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct ImageReq<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    n: u8,
}

#[derive(Deserialize)]
struct ImageResp {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
}

/// Quota exhaustion is reported as 429 or as an `insufficient_quota` code.
pub(crate) fn is_quota_error(status: StatusCode, body: &str) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || body.contains("insufficient_quota")
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let req = ImageReq {
            model: &self.model,
            prompt,
            size: &self.size,
            n: 1,
        };
        let resp = self
            .http
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| PipelineError::ImageGeneration(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if is_quota_error(status, &body) {
                return Err(PipelineError::RateLimited(format!(
                    "image quota exhausted for model {} (HTTP {status}); check billing/limits: {}",
                    self.model,
                    preview(&body)
                )));
            }
            return Err(PipelineError::ImageGeneration(format!(
                "HTTP {status}: {}",
                preview(&body)
            )));
        }

        let body: ImageResp = resp
            .json()
            .await
            .map_err(|e| PipelineError::ImageGeneration(e.to_string()))?;
        body.data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| PipelineError::ImageGeneration("response carried no b64_json".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_errors_are_detected() {
        assert!(is_quota_error(StatusCode::TOO_MANY_REQUESTS, ""));
        assert!(is_quota_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":"insufficient_quota"}}"#
        ));
        assert!(!is_quota_error(StatusCode::BAD_REQUEST, r#"{"error":{"code":"invalid_prompt"}}"#));
    }

    #[test]
    fn blank_key_is_rejected() {
        assert!(OpenAiGenerator::new("  ", "gpt-4.1-mini").is_err());
        assert!(OpenAiImageGenerator::new("", "gpt-image-1", "1536x1024").is_err());
    }
}
