// src/pipeline.rs
//! # Pipeline orchestrator
//! Drives the fixed stage sequence
//! `OUTLINE → DRAFT → IMAGE_PROMPTS → IMAGE_RESOLUTION → PUBLISH`.
//!
//! Each stage consumes the previous stage's output; nothing runs in parallel
//! and nothing is retried. OUTLINE and DRAFT failures abort the run. Image
//! failures only drop the affected placeholder. A PUBLISH failure is returned
//! together with the finished article, so publishing can be retried alone
//! without spending generation budget again.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::article::ArticlePayload;
use crate::collab::{PublishRequest, PublishResponse, Publisher, TextGenerator, WebSearch};
use crate::config::{BrandConfig, InternalLink, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::events::{PipelineEvent, PipelineObserver, Stage, TracingObserver};
use crate::extract::{extract_object, ExtractMode, JsonObject};
use crate::generation::GenerationGate;
use crate::images::{find_placeholders, inject_images, ImagePrompt, ImageResolver, ResolvedImage, SkippedImage};
use crate::prompts;
use crate::rate_limit::RateLimiter;
use crate::store::ArticleStore;
use crate::topic::{TopicSelection, TopicSelector};

/// One-time metrics registration so the series exist before first use.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_llm_calls_total", "Generation calls issued through the rate limiter.");
        describe_counter!("pipeline_images_resolved_total", "Image placeholders replaced by a figure.");
        describe_counter!(
            "pipeline_images_skipped_total",
            "Image placeholders left in place after a failed resolution."
        );
        describe_counter!("pipeline_publish_failures_total", "Failed publish attempts.");
        describe_counter!(
            "pipeline_topic_fallback_total",
            "Topic selections that fell back to the configured topic."
        );
    });
}

/// External services the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn TextGenerator>,
    pub search: Arc<dyn WebSearch>,
    pub resolver: Arc<dyn ImageResolver>,
    pub publisher: Arc<dyn Publisher>,
}

/// Everything produced before PUBLISH.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedArticle {
    pub topic: TopicSelection,
    pub outline: String,
    pub article: ArticlePayload,
    pub images: Vec<ResolvedImage>,
    pub skipped_images: Vec<SkippedImage>,
    pub saved_to: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated: GeneratedArticle,
    pub published: PublishResponse,
    /// Generation calls made by this run only.
    pub llm_calls: u32,
}

#[derive(Error, Debug)]
pub enum RunError {
    /// OUTLINE or DRAFT failed; later stages did not run.
    #[error("run aborted at {stage}: {error}")]
    Aborted {
        stage: Stage,
        #[source]
        error: PipelineError,
    },
    /// Content exists; only the publish call failed.
    #[error("publish failed for '{}': {error}", .article.article.slug)]
    PublishFailed {
        article: Box<GeneratedArticle>,
        #[source]
        error: PipelineError,
    },
}

impl RunError {
    pub fn stage(&self) -> Stage {
        match self {
            RunError::Aborted { stage, .. } => *stage,
            RunError::PublishFailed { .. } => Stage::Publish,
        }
    }
}

pub struct PipelineOrchestrator {
    gate: GenerationGate,
    search: Arc<dyn WebSearch>,
    resolver: Arc<dyn ImageResolver>,
    publisher: Arc<dyn Publisher>,
    observer: Arc<dyn PipelineObserver>,
    store: Option<ArticleStore>,
    brand: BrandConfig,
    internal_links: Vec<InternalLink>,
    fallback_topic: TopicSelection,
}

impl PipelineOrchestrator {
    /// The limiter is injected so several orchestrators can share one budget.
    pub fn new(collab: Collaborators, limiter: RateLimiter, cfg: &PipelineConfig) -> Self {
        ensure_metrics_described();
        Self {
            gate: GenerationGate::new(collab.generator, limiter),
            search: collab.search,
            resolver: collab.resolver,
            publisher: collab.publisher,
            observer: Arc::new(TracingObserver),
            store: cfg.output_dir().map(ArticleStore::new),
            brand: cfg.brand.clone(),
            internal_links: cfg.internal_links.clone(),
            fallback_topic: cfg.fallback_topic.clone(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_store(mut self, store: Option<ArticleStore>) -> Self {
        self.store = store;
        self
    }

    /// Generation calls made by this orchestrator so far, across runs
    /// (topic selection included).
    pub fn llm_calls(&self) -> u32 {
        self.gate.call_count()
    }

    pub async fn select_topic(&self, today: NaiveDate) -> TopicSelection {
        TopicSelector::new(&self.gate, &self.fallback_topic)
            .select(today)
            .await
    }

    fn emit(&self, event: PipelineEvent) {
        self.observer.on_event(&event);
    }

    fn started(&self, stage: Stage) {
        self.emit(PipelineEvent::StageStarted { stage });
    }

    fn completed(&self, stage: Stage) {
        self.emit(PipelineEvent::StageCompleted { stage });
    }

    /// All stages, publish last.
    pub async fn run(&self, topic: &TopicSelection) -> std::result::Result<RunReport, RunError> {
        let calls_before = self.llm_calls();
        let generated = self.generate(topic).await?;
        match self.publish(&generated).await {
            Ok(published) => Ok(RunReport {
                generated,
                published,
                llm_calls: self.llm_calls() - calls_before,
            }),
            Err(error) => Err(RunError::PublishFailed {
                article: Box::new(generated),
                error,
            }),
        }
    }

    /// OUTLINE → DRAFT → IMAGE_PROMPTS → IMAGE_RESOLUTION, then save.
    pub async fn generate(&self, topic: &TopicSelection) -> std::result::Result<GeneratedArticle, RunError> {
        let outline = self
            .outline(topic)
            .await
            .map_err(|error| RunError::Aborted { stage: Stage::Outline, error })?;
        let (mut article, draft) = self
            .draft(topic, &outline)
            .await
            .map_err(|error| RunError::Aborted { stage: Stage::Draft, error })?;
        let image_prompts = self.image_prompts(&article, &draft).await;

        self.started(Stage::ImageResolution);
        let outcome = inject_images(
            &article.content_html,
            &article.slug,
            &image_prompts,
            self.resolver.as_ref(),
            self.observer.as_ref(),
        )
        .await;
        article.content_html = outcome.content_html;
        info!(
            target: "pipeline",
            resolved = outcome.resolved.len(),
            skipped = outcome.skipped.len(),
            "images injected"
        );
        self.completed(Stage::ImageResolution);

        let saved_to = self.save(&article);
        Ok(GeneratedArticle {
            topic: topic.clone(),
            outline,
            article,
            images: outcome.resolved,
            skipped_images: outcome.skipped,
            saved_to,
        })
    }

    /// PUBLISH only; safe to call again after a failure.
    pub async fn publish(&self, generated: &GeneratedArticle) -> Result<PublishResponse> {
        self.started(Stage::Publish);
        let res = publish_article(self.publisher.as_ref(), &generated.article).await;
        match &res {
            Ok(resp) => {
                info!(target: "pipeline", post_id = resp.id, link = %resp.link, "article published");
                self.completed(Stage::Publish);
            }
            Err(e) => warn!(target: "pipeline", slug = %generated.article.slug, error = %e, "publish failed"),
        }
        res
    }

    async fn outline(&self, topic: &TopicSelection) -> Result<String> {
        self.started(Stage::Outline);
        let hits = match self.search.search(&topic.topic).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(target: "pipeline", error = %e, "search failed, outlining without research");
                Vec::new()
            }
        };
        let raw = self
            .gate
            .call(
                "outline",
                &prompts::content_planner(),
                &prompts::outline_instructions(topic, &hits),
            )
            .await?;
        let outline = raw.trim();
        if outline.is_empty() {
            return Err(PipelineError::extraction_failed(&raw));
        }
        self.completed(Stage::Outline);
        Ok(outline.to_string())
    }

    async fn draft(&self, topic: &TopicSelection, outline: &str) -> Result<(ArticlePayload, JsonObject)> {
        self.started(Stage::Draft);
        let raw = self
            .gate
            .call(
                "draft",
                &prompts::seo_writer(&self.brand),
                &prompts::draft_instructions(topic, outline, &self.brand, &self.internal_links),
            )
            .await?;
        let draft = extract_object(&raw, ExtractMode::Span)?;
        let article = ArticlePayload::from_draft(&draft);
        info!(target: "pipeline", title = %article.title, slug = %article.slug, "draft ready");
        self.completed(Stage::Draft);
        Ok((article, draft))
    }

    /// Never fails: a bad or missing answer leaves placeholders on derived prompts.
    async fn image_prompts(&self, article: &ArticlePayload, draft: &JsonObject) -> Vec<ImagePrompt> {
        self.started(Stage::ImagePrompts);
        let descriptions: Vec<String> = find_placeholders(&article.content_html)
            .into_iter()
            .map(|p| p.description)
            .collect();
        if descriptions.is_empty() {
            debug!(target: "pipeline", "no image placeholders, skipping prompt generation");
            self.completed(Stage::ImagePrompts);
            return Vec::new();
        }

        let draft_json = serde_json::to_string(draft).unwrap_or_default();
        let parsed = match self
            .gate
            .call(
                "image prompts",
                &prompts::visual_artist(),
                &prompts::image_prompt_instructions(&draft_json, &descriptions),
            )
            .await
            .and_then(|raw| extract_object(&raw, ExtractMode::Discriminator("images")))
        {
            Ok(obj) => parse_image_prompts(&obj, &descriptions),
            Err(e) => {
                warn!(target: "pipeline", error = %e, "image prompt stage failed, using derived prompts");
                Vec::new()
            }
        };
        self.completed(Stage::ImagePrompts);
        parsed
    }

    fn save(&self, article: &ArticlePayload) -> Option<PathBuf> {
        let store = self.store.as_ref()?;
        match store.save(article) {
            Ok(path) => {
                info!(target: "pipeline", path = %path.display(), "article saved");
                Some(path)
            }
            Err(e) => {
                warn!(target: "pipeline", error = %e, "saving article failed");
                None
            }
        }
    }
}

/// Read `{"images": [...]}`. Items are prompt strings in placeholder order,
/// or `{description?, prompt}` objects. Anything else is ignored.
///
/// The object form only arrives through a fenced reply: the unfenced
/// `images` scan stops at the first `}` and cannot see nested objects.
pub fn parse_image_prompts(obj: &JsonObject, descriptions: &[String]) -> Vec<ImagePrompt> {
    let Some(items) = obj.get("images").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let (desc, prompt) = match item {
                Value::String(p) => (descriptions.get(i)?.clone(), p.clone()),
                Value::Object(o) => {
                    let prompt = o.get("prompt")?.as_str()?.to_string();
                    let desc = o
                        .get("description")
                        .and_then(Value::as_str)
                        .map(|d| d.trim().to_string())
                        .or_else(|| descriptions.get(i).cloned())?;
                    (desc, prompt)
                }
                _ => return None,
            };
            (!prompt.trim().is_empty()).then_some(ImagePrompt {
                description: desc,
                prompt,
            })
        })
        .collect()
}

/// One publish attempt for a finished article; excerpt is the meta description.
pub async fn publish_article(publisher: &dyn Publisher, article: &ArticlePayload) -> Result<PublishResponse> {
    publisher
        .publish(PublishRequest {
            title: &article.title,
            content_html: &article.content_html,
            slug: &article.slug,
            excerpt: &article.meta_description,
        })
        .await
        .map_err(|e| {
            counter!("pipeline_publish_failures_total").increment(1);
            match e {
                PipelineError::PublishFailed(_) => e,
                other => PipelineError::PublishFailed(other.to_string()),
            }
        })
}
