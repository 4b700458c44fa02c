//! Bounded retry for the secondary data provider
//!
//! Yahoo Finance regularly answers A-share requests with errors or with a
//! stub payload. [`RetryPolicy::run`] retries both cases a fixed number of
//! times with a fixed delay and then gives up with `None`, so callers can
//! carry on with primary-provider data alone.

use crate::api::{DailyBar, FallbackProvider, HistoryRange, TickerInfo};
use crate::error::{Result, StockError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it yields a non-degenerate value
    ///
    /// Errors and degenerate values are both retried. After `max_attempts`
    /// failures the result is `None`; errors never escape.
    pub async fn run<T, F, Fut, D>(&self, operation: &str, mut op: F, is_degenerate: D) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        D: Fn(&T) -> bool,
    {
        for attempt in 1..=self.max_attempts {
            match op().await {
                Ok(value) if !is_degenerate(&value) => {
                    debug!(operation, attempt, "Call succeeded");
                    return Some(value);
                }
                Ok(_) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Degenerate response"
                    );
                }
                Err(e) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Call failed"
                    );
                }
            }

            if attempt < self.max_attempts && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        warn!(
            operation,
            max_attempts = self.max_attempts,
            "Giving up after all attempts"
        );
        None
    }
}

/// Secondary provider with every call wrapped in a [`RetryPolicy`]
#[derive(Clone)]
pub struct RetryingFallback {
    inner: Arc<dyn FallbackProvider>,
    policy: RetryPolicy,
    summary_policy: RetryPolicy,
}

impl RetryingFallback {
    pub fn new(inner: Arc<dyn FallbackProvider>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            summary_policy: RetryPolicy::new(3, Duration::from_millis(500)),
        }
    }

    /// Override the policy used when fetching the business summary
    pub fn with_summary_policy(mut self, policy: RetryPolicy) -> Self {
        self.summary_policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Ticker info, or `None` once every attempt failed or was degenerate
    pub async fn ticker_info(&self, code: &str) -> Option<TickerInfo> {
        self.policy
            .run(
                "yahoo.ticker_info",
                || self.inner.ticker_info(code),
                |info: &TickerInfo| info.is_empty() || info.is_degenerate(),
            )
            .await
    }

    pub async fn history(&self, code: &str, range: HistoryRange) -> Option<Vec<DailyBar>> {
        self.policy
            .run(
                "yahoo.history",
                || self.inner.history(code, range),
                Vec::is_empty,
            )
            .await
    }

    /// `longBusinessSummary`, retried on its own shorter policy
    pub async fn business_summary(&self, code: &str) -> Option<String> {
        self.summary_policy
            .run(
                "yahoo.business_summary",
                || async {
                    let info = self.inner.ticker_info(code).await?;
                    Ok::<_, StockError>(
                        info.str("longBusinessSummary")
                            .filter(|s| !s.trim().is_empty())
                            .map(str::to_string),
                    )
                },
                Option::is_none,
            )
            .await
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FakeFallback;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_first_success_stops() {
        let calls = AtomicU32::new(0);
        let result = instant(5)
            .run(
                "op",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, StockError>(7)
                },
                |_| false,
            )
            .await;

        assert_eq!(result, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_exhaust_bound_and_return_none() {
        let calls = AtomicU32::new(0);
        let result: Option<u32> = instant(5)
            .run(
                "op",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(StockError::YahooFinanceError("429".to_string()))
                },
                |_| false,
            )
            .await;

        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_degenerate_values_are_retried() {
        let calls = AtomicU32::new(0);
        let result = instant(4)
            .run(
                "op",
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok::<_, StockError>(n)
                },
                |n| *n < 3,
            )
            .await;

        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_degenerate_ticker_info_retried_to_bound() {
        let fake = Arc::new(FakeFallback::degenerate());
        let fallback = RetryingFallback::new(fake.clone(), instant(5));

        assert!(fallback.ticker_info("600519").await.is_none());
        assert_eq!(fake.info_calls(), 5);
    }

    #[tokio::test]
    async fn test_business_summary_uses_own_policy() {
        let fake = Arc::new(FakeFallback::failing());
        let fallback = RetryingFallback::new(fake.clone(), instant(5))
            .with_summary_policy(instant(3));

        assert!(fallback.business_summary("600519").await.is_none());
        assert_eq!(fake.info_calls(), 3);
    }

    #[tokio::test]
    async fn test_business_summary_found() {
        let fake = Arc::new(FakeFallback::moutai());
        let fallback = RetryingFallback::new(fake, instant(2));
        let summary = fallback.business_summary("600519").await.unwrap();
        assert!(summary.contains("Moutai"));
    }
}
