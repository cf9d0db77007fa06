// src/generation.rs
//! Rate-limited, counted access to the shared text generator.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use metrics::counter;
use tracing::info;

use crate::collab::{RoleContext, TextGenerator};
use crate::error::Result;
use crate::rate_limit::RateLimiter;

/// Every generation call goes through [`GenerationGate::call`], which waits
/// on the limiter first. The limiter is released before the call is made.
pub struct GenerationGate {
    generator: Arc<dyn TextGenerator>,
    limiter: RateLimiter,
    calls: AtomicU32,
}

impl GenerationGate {
    pub fn new(generator: Arc<dyn TextGenerator>, limiter: RateLimiter) -> Self {
        Self {
            generator,
            limiter,
            calls: AtomicU32::new(0),
        }
    }

    pub async fn call(&self, label: &str, role: &RoleContext, instructions: &str) -> Result<String> {
        self.limiter.acquire().await;
        let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        counter!("pipeline_llm_calls_total").increment(1);
        info!(target: "llm", call = n, provider = self.generator.name(), "llm call #{n} → {label}");
        self.generator.generate(role, instructions).await
    }

    /// Calls issued through this gate so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}
