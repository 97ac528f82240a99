use super::error::FetchError;
use crate::config::types::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Bounded exponential backoff for a single fetch call.
///
/// The attempt counter lives inside [`RetryPolicy::run`], so every call starts
/// from a fresh count.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based): the initial
    /// backoff doubled per completed attempt, capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error, or
    /// the attempt cap is reached. Returns the value and the number of attempts.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<(T, u32), FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => return Ok((value, attempt)),
                Err(e) if !e.is_retryable() => {
                    debug!(attempt, error = %e, "Request failed with non-retryable error");
                    return Err(e);
                }
                Err(e) if attempt >= max_attempts => {
                    error!(attempts = attempt, error = %e, "Max retries exceeded");
                    return Err(FetchError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let backoff = self.backoff_for(attempt);
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
