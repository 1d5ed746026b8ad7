//! Bounded retry with capped exponential backoff.

use std::future::Future;
use std::time::Duration;

use vaultdb_core::config::EmbeddingSettings;
use vaultdb_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, initial_backoff: Duration::from_millis(200), max_backoff: Duration::from_secs(5) }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1u32 << exp).min(self.max_backoff)
    }
}

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub enum Attempt {
    /// Transient failure; try again while attempts remain.
    Retry(String),
    /// Permanent failure; surface immediately.
    Fail(Error),
}

/// Run `op` until it succeeds, fails permanently, or the policy is exhausted.
/// `op` receives the 1-based attempt number.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, Attempt>>,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(Attempt::Fail(err)) => return Err(err),
            Err(Attempt::Retry(cause)) if attempt >= max => {
                return Err(Error::EmbeddingService(format!("{what} failed after {attempt} attempts: {cause}")));
            }
            Err(Attempt::Retry(cause)) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(attempt, max, ?delay, %cause, "{what} failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
