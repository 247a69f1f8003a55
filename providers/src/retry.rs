//! Retry Policy
//!
//! Exponential backoff for transport-level failures. Validation and
//! server-reported business errors pass through on the first attempt; only
//! errors the predicate accepts are retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{ProviderError, Result};
use veilkit_config::RetryConfig;

/// Backoff parameters; defaults match the workspace configuration defaults.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        exp.min(self.max_delay)
    }
}

/// Run `operation` with exponential backoff.
///
/// `should_retry` decides which errors are transient; the final error is
/// returned unchanged once attempts are exhausted.
pub async fn retry_with_backoff<T, F, Fut, P>(
    policy: &RetryPolicy,
    op_name: &str,
    should_retry: P,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&ProviderError) -> bool,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries && should_retry(&err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{op_name} attempt {} failed ({err}), retrying in {:?}",
                    attempt + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            &fast_policy(),
            "test",
            ProviderError::is_retryable,
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::Network("flaky".into()))
                } else {
                    Ok(42)
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_validation_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(
            &fast_policy(),
            "test",
            ProviderError::is_retryable,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::WalletNotConnected)
            },
        )
        .await;
        assert!(matches!(result, Err(ProviderError::WalletNotConnected)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(
            &fast_policy(),
            "test",
            ProviderError::is_retryable,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Network("down".into()))
            },
        )
        .await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
        // 1 initial + 3 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_delay_caps_at_max() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for(9), Duration::from_millis(350));
    }
}
