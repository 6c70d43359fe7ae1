//! In-memory per-client rate limiter using the governor crate.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::Clock;
use governor::{DefaultKeyedRateLimiter, Quota};

use quill_core::ports::{RateLimitDecision, RateLimitError, RateLimiter};

/// Keys tracked before idle entries are swept.
const SWEEP_THRESHOLD: usize = 10_000;

/// In-memory rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    fn quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.max_requests).unwrap_or(NonZeroU32::MIN);
        let period = self.window / burst.get();

        Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst)
    }
}

/// GCRA limiter keyed by client identifier.
///
/// Limits are per-process, not shared across instances.
pub struct InMemoryRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: DefaultKeyedRateLimiter::keyed(config.quota()),
        }
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitDecision, RateLimitError> {
        let decision = match self.limiter.check_key(&key.to_string()) {
            Ok(()) => RateLimitDecision::Allowed,
            Err(not_until) => RateLimitDecision::Limited {
                retry_after: not_until.wait_time_from(self.limiter.clock().now()),
            },
        };

        if self.limiter.len() > SWEEP_THRESHOLD {
            self.limiter.retain_recent();
        }

        Ok(decision)
    }
}
