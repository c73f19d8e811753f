use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::FareError;

pub const DEFAULT_LIMIT: usize = 20;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window request counter keyed by an opaque client identity.
/// Each identity owns its own bucket, so a burst from one client never
/// consumes another client's allowance.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, identity: &str, limit: usize, window: Duration) -> Result<(), FareError> {
        self.check_at(identity, limit, window, Instant::now())
    }

    pub fn check_at(
        &self,
        identity: &str,
        limit: usize,
        window: Duration,
        now: Instant,
    ) -> Result<(), FareError> {
        let mut bucket = self.buckets.entry(identity.to_string()).or_default();

        while let Some(&oldest) = bucket.front() {
            if now.saturating_duration_since(oldest) >= window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        if bucket.len() >= limit {
            let elapsed = bucket
                .front()
                .map(|&oldest| now.saturating_duration_since(oldest))
                .unwrap_or_default();
            let remaining = window.saturating_sub(elapsed);
            let retry_after_secs = remaining.as_nanos().div_ceil(1_000_000_000).max(1) as u64;
            tracing::debug!(identity, retry_after_secs, "rate limit exceeded");
            return Err(FareError::RateLimited { retry_after_secs });
        }

        bucket.push_back(now);
        Ok(())
    }

    /// Requests currently counted against `identity`, without pruning.
    pub fn recorded(&self, identity: &str) -> usize {
        self.buckets.get(identity).map(|b| b.len()).unwrap_or(0)
    }
}
