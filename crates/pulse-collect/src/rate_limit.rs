//! Rolling-window rate limiter shared by all requests to one source.
//!
//! Each source gets its own limiter sized to the upstream budget (60/min for
//! Reddit, 1000/day for News). A permit is recorded at grant time; permits
//! older than the window no longer count against the budget.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::CollectError;

/// Rolling-window request limiter for a single upstream source.
pub struct RateLimiter {
    source_name: &'static str,
    budget: usize,
    window: Duration,
    max_wait: Duration,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `budget` requests per `window`, where
    /// [`RateLimiter::acquire`] blocks for at most `max_wait` before giving up.
    #[must_use]
    pub fn new(
        source_name: &'static str,
        budget: usize,
        window: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            source_name,
            budget,
            window,
            max_wait,
            grants: Mutex::new(VecDeque::with_capacity(budget.min(1024))),
        }
    }

    /// Acquire a permit, waiting until one frees up within the window.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::RateLimitExceeded`] when no permit would free
    /// up within `max_wait`. The caller skips the source for this cycle.
    pub async fn acquire(&self) -> Result<(), CollectError> {
        let deadline = Instant::now() + self.max_wait;
        loop {
            let wait = {
                let mut grants = self.grants.lock().await;
                let now = Instant::now();
                while let Some(&oldest) = grants.front() {
                    if now.duration_since(oldest) >= self.window {
                        grants.pop_front();
                    } else {
                        break;
                    }
                }
                if grants.len() < self.budget {
                    grants.push_back(now);
                    return Ok(());
                }
                // Oldest grant leaving the window frees the next permit.
                let oldest = grants[0];
                (oldest + self.window).saturating_duration_since(now)
            };

            if Instant::now() + wait > deadline {
                tracing::warn!(
                    source = self.source_name,
                    budget = self.budget,
                    window_secs = self.window.as_secs(),
                    "request budget exhausted, refusing to wait past deadline"
                );
                return Err(CollectError::RateLimitExceeded {
                    source_name: self.source_name,
                    budget: self.budget,
                    window_secs: self.window.as_secs(),
                });
            }
            tokio::time::sleep(wait).await;
        }
    }

    /// Take a permit if one is free right now, without waiting.
    pub async fn try_acquire(&self) -> bool {
        let mut grants = self.grants.lock().await;
        let now = Instant::now();
        while let Some(&oldest) = grants.front() {
            if now.duration_since(oldest) >= self.window {
                grants.pop_front();
            } else {
                break;
            }
        }
        if grants.len() < self.budget {
            grants.push_back(now);
            true
        } else {
            false
        }
    }
}
