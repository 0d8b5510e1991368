//! Bounded retry policy for transient conflicts.
//!
//! The wallet ledger's optimistic writes fail with a version conflict when
//! another writer commits first. Those conflicts are transient, so callers
//! retry a fixed number of times with a fixed spacing. Business-rule
//! failures are never retried; the caller decides what counts as retryable.

use std::future::Future;
use std::time::Duration;

/// A bounded, fixed-delay retry policy.
///
/// The policy is plain data so the backoff strategy can change without
/// touching call sites.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is exhausted. The last error is returned verbatim.
    pub async fn run<T, E, F, Fut, R>(&self, mut op: F, mut is_retryable: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: FnMut(&E) -> bool,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && is_retryable(&err) => {
                    tokio::time::sleep(self.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    #[tokio::test]
    async fn succeeds_first_attempt() {
        let policy = RetryPolicy::default();
        let result: Result<i32, TestError> = policy
            .run(|| async { Ok(42) }, |_| true)
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let attempts = AtomicU32::new(0);
        let result = policy
            .run(
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(TestError::Transient)
                        } else {
                            Ok("done")
                        }
                    }
                },
                |e| *e == TestError::Transient,
            )
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausting_budget_returns_last_error() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let attempts = AtomicU32::new(0);
        let result: Result<(), TestError> = policy
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(TestError::Transient) }
                },
                |e| *e == TestError::Transient,
            )
            .await;
        assert_eq!(result.unwrap_err(), TestError::Transient);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let attempts = AtomicU32::new(0);
        let result: Result<(), TestError> = policy
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(TestError::Fatal) }
                },
                |e| *e == TestError::Transient,
            )
            .await;
        assert_eq!(result.unwrap_err(), TestError::Fatal);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
