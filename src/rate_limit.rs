// src/rate_limit.rs
//! Fixed-window limiter for calls into the shared text-generation quota.
//!
//! Policy: at most `limit` calls per non-overlapping window of `window`
//! length, measured on the limiter's own clock. On exhaustion the caller
//! sleeps for the remainder of the window and then re-checks; the lock is
//! never held across the sleep or across the generation call itself.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_MAX_CALLS: u32 = 3;
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// Window state guarded by the limiter's mutex.
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    pub window_start: Instant,
    pub count: u32,
    pub limit: u32,
    pub window: Duration,
}

impl RateWindow {
    fn new(limit: u32, window: Duration) -> Self {
        Self {
            window_start: Instant::now(),
            count: 0,
            limit,
            window,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= self.window
    }

    fn reset(&mut self, now: Instant) {
        self.window_start = now;
        self.count = 0;
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.window
            .saturating_sub(now.saturating_duration_since(self.window_start))
    }
}

/// Cloning shares the window, so every clone draws from the same budget.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<RateWindow>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALLS, Duration::from_secs(DEFAULT_WINDOW_SECS))
    }
}

impl RateLimiter {
    /// `limit == 0` is treated as 1 so `acquire` can always make progress.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(RateWindow::new(limit.max(1), window))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RateWindow> {
        // The window is plain data and valid after any partial update.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait until one more call fits in the current window, then count it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut w = self.lock();
                let now = Instant::now();
                if w.is_expired(now) {
                    w.reset(now);
                }
                if w.count < w.limit {
                    w.count += 1;
                    debug!(target: "rate_limit", count = w.count, limit = w.limit, "slot acquired");
                    return;
                }
                w.remaining(now)
            };
            debug!(target: "rate_limit", wait_ms = wait.as_millis() as u64, "window exhausted, sleeping");
            tokio::time::sleep(wait).await;
        }
    }

    /// Point-in-time copy of the window state.
    pub fn snapshot(&self) -> RateWindow {
        *self.lock()
    }
}
