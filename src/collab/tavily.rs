// src/collab/tavily.rs
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SearchHit, WebSearch};
use crate::error::{preview, PipelineError, Result};

const SEARCH_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: u8 = 5;

pub struct TavilySearch {
    http: reqwest::Client,
    api_key: String,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building Tavily HTTP client")?;
        Ok(Self {
            http,
            api_key: api_key.into(),
        })
    }
}

#[derive(Serialize)]
struct SearchReq<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u8,
}

#[derive(Deserialize)]
struct SearchResp {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Highest score first; ties keep provider order.
pub(crate) fn rank(mut hits: Vec<SearchHit>) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if self.api_key.is_empty() {
            return Err(PipelineError::Search("TAVILY_API_KEY is not set".into()));
        }
        let resp = self
            .http
            .post(SEARCH_URL)
            .json(&SearchReq {
                api_key: &self.api_key,
                query,
                max_results: MAX_RESULTS,
            })
            .send()
            .await
            .map_err(|e| PipelineError::Search(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Search(format!("HTTP {status}: {}", preview(&body))));
        }
        let body: SearchResp = resp
            .json()
            .await
            .map_err(|e| PipelineError::Search(e.to_string()))?;
        Ok(rank(body.results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str, score: f64) -> SearchHit {
        SearchHit {
            title: title.into(),
            url: format!("https://example.test/{title}"),
            content: String::new(),
            score,
        }
    }

    #[test]
    fn rank_orders_by_score_stably() {
        let ranked = rank(vec![hit("a", 0.2), hit("b", 0.9), hit("c", 0.2)]);
        let titles: Vec<_> = ranked.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let body: SearchResp =
            serde_json::from_str(r#"{"results":[{"title":"t","url":"u"}]}"#).unwrap();
        assert_eq!(body.results[0].score, 0.0);
        assert!(body.results[0].content.is_empty());
    }
}
