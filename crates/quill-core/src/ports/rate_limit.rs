//! Rate limiting port.

use std::time::Duration;

use async_trait::async_trait;

/// Per-client request limiter.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record one request for `key` (usually the client IP) and report
    /// whether it may proceed.
    async fn check(&self, key: &str) -> Result<RateLimitDecision, RateLimitError>;
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    /// Rejected; the client may retry after this long.
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Rate limit errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Backend error: {0}")]
    Backend(String),
}
