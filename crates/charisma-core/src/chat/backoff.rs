//! Retry backoff policies.
//!
//! The orchestrator sleeps between attempts according to a `Backoff`
//! implementation; tests inject `NoBackoff` so retries run instantly.

use std::time::Duration;

/// Delay policy between model-call attempts.
pub trait Backoff: Send + Sync {
    /// Delay before retry number `attempt` (the first retry is attempt 2).
    fn delay(&self, attempt: u32) -> Duration;
}

/// Doubles a base delay per retry: base, 2*base, 4*base, ...
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    pub fn from_millis(base_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms))
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2).min(16);
        self.base.saturating_mul(1 << exponent)
    }
}

/// No delay at all. For tests.
#[derive(Debug, Clone, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}
