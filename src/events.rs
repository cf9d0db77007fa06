// src/events.rs
//! Progress events emitted by the pipeline core.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Outline,
    Draft,
    ImagePrompts,
    ImageResolution,
    Publish,
}

impl Stage {
    /// Execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Outline,
        Stage::Draft,
        Stage::ImagePrompts,
        Stage::ImageResolution,
        Stage::Publish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Outline => "outline",
            Stage::Draft => "draft",
            Stage::ImagePrompts => "image_prompts",
            Stage::ImageResolution => "image_resolution",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted { stage: Stage },
    StageCompleted { stage: Stage },
    /// One sub-item (image placeholder) was dropped; the stage continues.
    ItemSkipped { stage: Stage, item: String, reason: String },
}

pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Default observer: structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => {
                info!(target: "pipeline", %stage, "stage started")
            }
            PipelineEvent::StageCompleted { stage } => {
                info!(target: "pipeline", %stage, "stage completed")
            }
            PipelineEvent::ItemSkipped {
                stage,
                item,
                reason,
            } => warn!(target: "pipeline", %stage, item = %item, reason = %reason, "item skipped"),
        }
    }
}
