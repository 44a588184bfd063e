//! Bounded retry with exponential backoff for external service calls.

use crate::error::{ResearchError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How often and how patiently a failed call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl From<&crate::config::RetryConfig> for RetryPolicy {
    fn from(config: &crate::config::RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent. Returns the last error in the latter case.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error: Option<ResearchError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.backoff(attempt);
                debug!(attempt, ?backoff, "Retrying {} after error", what);
                tokio::time::sleep(backoff).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    warn!(attempt, "{} failed: {}", what, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| ResearchError::generation(format!("{} failed", what))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast_policy(2)
            .run("search", || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ResearchError::retrieval("web", "unreachable"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = fast_policy(2)
            .run("search", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ResearchError::retrieval("web", "unreachable"))
            })
            .await;

        assert!(matches!(result, Err(ResearchError::Retrieval { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = tokio_test::block_on(fast_policy(5).run("parse", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ResearchError::validation("bad shape"))
        }));

        assert!(matches!(result, Err(ResearchError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
