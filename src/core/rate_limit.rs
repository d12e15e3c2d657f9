//! Rate limiting collaborator
//!
//! Create operations consult the limiter before doing any validation work,
//! so expensive validation can never be driven by an unthrottled caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Denied; the caller may retry after the given duration
    Limited { retry_after: Duration },
}

/// Trait for rate limiter collaborators.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check and consume one unit of quota for this actor and operation kind.
    async fn check_and_consume(&self, actor_id: Uuid, kind: &str) -> RateDecision;
}

/// Limiter that never denies. Default for tests and development.
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn check_and_consume(&self, _actor_id: Uuid, _kind: &str) -> RateDecision {
        RateDecision::Allowed
    }
}

/// Fixed-window in-memory limiter keyed by actor + kind.
pub struct FixedWindowLimiter {
    window: Duration,
    max_per_window: u32,
    counters: Mutex<HashMap<(Uuid, String), WindowState>>,
}

struct WindowState {
    window_start: DateTime<Utc>,
    count: u32,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max_per_window: u32) -> Self {
        Self {
            window,
            max_per_window,
            counters: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check_and_consume(&self, actor_id: Uuid, kind: &str) -> RateDecision {
        let now = Utc::now();
        let window = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::zero());

        let mut counters = match self.counters.lock() {
            Ok(guard) => guard,
            // A poisoned counter map fails open: availability over strictness
            Err(_) => return RateDecision::Allowed,
        };

        let state = counters
            .entry((actor_id, kind.to_string()))
            .or_insert(WindowState {
                window_start: now,
                count: 0,
            });

        if now - state.window_start >= window {
            state.window_start = now;
            state.count = 0;
        }

        if state.count >= self.max_per_window {
            let elapsed = (now - state.window_start)
                .to_std()
                .unwrap_or(Duration::ZERO);
            return RateDecision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            };
        }

        state.count += 1;
        RateDecision::Allowed
    }
}
