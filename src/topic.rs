// src/topic.rs
//! Daily topic selection with a hard fallback topic.

use chrono::NaiveDate;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::extract::{extract_object, ExtractMode, JsonObject};
use crate::generation::GenerationGate;
use crate::prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    News,
    #[default]
    Evergreen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSelection {
    pub topic: String,
    #[serde(default)]
    pub main_keyword: String,
    #[serde(default)]
    pub content_mode: ContentMode,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub outline_seed: Vec<String>,
}

impl Default for TopicSelection {
    fn default() -> Self {
        Self {
            topic: "Salesforce Flow Best Practices".into(),
            main_keyword: "salesforce flow best practices".into(),
            content_mode: ContentMode::Evergreen,
            target_audience: "Salesforce admins and developers".into(),
            reason: "Fallback evergreen topic used when topic selection fails.".into(),
            outline_seed: vec![
                "When to use record-triggered flows".into(),
                "Bulkification and limits".into(),
                "Error handling and fault paths".into(),
                "Testing and deployment".into(),
            ],
        }
    }
}

impl TopicSelection {
    /// Explicit topic from the command line; keyword defaults to the topic.
    pub fn manual(topic: &str, main_keyword: Option<&str>) -> Self {
        Self {
            topic: topic.trim().to_string(),
            main_keyword: main_keyword
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| topic.trim().to_lowercase()),
            content_mode: ContentMode::Evergreen,
            target_audience: String::new(),
            reason: "provided by operator".into(),
            outline_seed: Vec::new(),
        }
    }

    /// Lenient conversion from an extracted object. `None` when no usable
    /// topic string is present; other gaps are filled from `fallback`.
    pub fn from_object(obj: &JsonObject, fallback: &TopicSelection) -> Option<Self> {
        let text = |k: &str| {
            obj.get(k)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let topic = text("topic")?;
        let main_keyword = text("main_keyword").unwrap_or_else(|| topic.to_lowercase());
        let content_mode = match text("content_mode").map(|m| m.to_ascii_lowercase()).as_deref() {
            Some("news") => ContentMode::News,
            Some("evergreen") => ContentMode::Evergreen,
            _ => fallback.content_mode,
        };
        let outline_seed = obj
            .get("outline_seed")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            topic,
            main_keyword,
            content_mode,
            target_audience: text("target_audience")
                .unwrap_or_else(|| fallback.target_audience.clone()),
            reason: text("reason").unwrap_or_default(),
            outline_seed,
        })
    }
}

/// Chooses the day's topic. Never fails: any generation or extraction
/// problem yields the configured fallback topic.
pub struct TopicSelector<'a> {
    gate: &'a GenerationGate,
    fallback: &'a TopicSelection,
}

impl<'a> TopicSelector<'a> {
    pub fn new(gate: &'a GenerationGate, fallback: &'a TopicSelection) -> Self {
        Self { gate, fallback }
    }

    pub async fn select(&self, today: NaiveDate) -> TopicSelection {
        let raw = match self
            .gate
            .call(
                "topic selection",
                &prompts::topic_scout(),
                &prompts::topic_instructions(today),
            )
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(target: "topic", error = %e, "topic generation failed, using fallback topic");
                return self.use_fallback();
            }
        };

        let parsed = extract_object(&raw, ExtractMode::Discriminator("topic"))
            .map_err(|e| warn!(target: "topic", error = %e, "topic extraction failed"))
            .ok()
            .and_then(|obj| TopicSelection::from_object(&obj, self.fallback));

        match parsed {
            Some(sel) => {
                info!(target: "topic", topic = %sel.topic, mode = ?sel.content_mode, "topic selected");
                sel
            }
            None => self.use_fallback(),
        }
    }

    fn use_fallback(&self) -> TopicSelection {
        counter!("pipeline_topic_fallback_total").increment(1);
        self.fallback.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_object_fills_gaps() {
        let fb = TopicSelection::default();
        let obj = json!({"topic": " Apex Triggers ", "content_mode": "NEWS", "outline_seed": ["a", 3, " "]});
        let sel = TopicSelection::from_object(obj.as_object().unwrap(), &fb).unwrap();
        assert_eq!(sel.topic, "Apex Triggers");
        assert_eq!(sel.main_keyword, "apex triggers");
        assert_eq!(sel.content_mode, ContentMode::News);
        assert_eq!(sel.target_audience, fb.target_audience);
        assert_eq!(sel.outline_seed, vec!["a".to_string()]);
    }

    #[test]
    fn blank_topic_is_rejected() {
        let obj = json!({"topic": "   "});
        assert!(TopicSelection::from_object(obj.as_object().unwrap(), &TopicSelection::default()).is_none());
    }

    #[test]
    fn manual_keyword_defaults_to_topic() {
        let sel = TopicSelection::manual("Salesforce Agentforce Use Cases", None);
        assert_eq!(sel.main_keyword, "salesforce agentforce use cases");
        let sel = TopicSelection::manual("X", Some(" Agentforce "));
        assert_eq!(sel.main_keyword, "Agentforce");
    }
}
