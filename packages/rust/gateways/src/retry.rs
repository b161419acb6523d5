//! Exponential-backoff retry for gateway calls.
//!
//! Both hosted gateways are rate-limited paid APIs; transient failures are
//! retried with doubling delays, and the final error propagates unchanged so
//! callers see the same failure taxonomy as a single-attempt call.

use std::time::Duration;

use tracing::warn;

use lessonforge_shared::{Result, RetryConfig};

/// Retry policy for one gateway: total attempts and base delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per call. 1 means no retry.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per subsequent attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Single-attempt policy.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Run `operation` up to `policy.max_attempts` times with doubling delays.
pub async fn with_retry<T, Fut, F>(policy: &RetryPolicy, op: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = policy.base_delay;
    let mut attempt: u32 = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts => {
                warn!(
                    op,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "gateway call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
