//! Bounded exponential backoff for operations waiting on eventually-consistent writes.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Backoff schedule: `initial_delay * multiplier^attempt`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    /// Five retries from 500ms doubling up to 8s, used while a new user document appears.
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(8000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as usize) as i32);
        let delay_ms = self.initial_delay.as_millis() as f64 * factor;
        let delay = Duration::from_millis(delay_ms.min(u64::MAX as f64) as u64);
        delay.min(self.max_delay)
    }
}

/// Polls `lookup` until it yields a value, sleeping between attempts.
///
/// Returns `Ok(None)` when every attempt came back empty; errors end the poll immediately.
pub async fn poll_until_some<F, Fut, T, E>(policy: RetryPolicy, mut lookup: F) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let mut attempt = 0;
    loop {
        if let Some(value) = lookup().await? {
            return Ok(Some(value));
        }
        if attempt >= policy.max_retries {
            return Ok(None);
        }

        let delay = policy.delay_for_attempt(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "value not ready, backing off");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
