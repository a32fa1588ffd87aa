//! Retry logic for whole-file processing.
//!
//! A [`RetryPolicy`] is plain data: how many attempts, and how long to wait
//! between them. [`with_retry`] applies a policy to any async unit of work.
//!
//! # Example
//!
//! ```
//! use intake_core::{Error, RetryPolicy, with_retry};
//!
//! # async fn example() -> Result<(), Error> {
//! // 5 attempts, waiting 2s, 2s, 4s, 8s between them
//! let policy = RetryPolicy::default();
//!
//! let rows = with_retry(&policy, "persist", |_attempt| async {
//!     // Your fallible operation here
//!     Ok::<_, Error>(42)
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Scale applied to the exponential term.
    pub multiplier: f64,
    /// Shortest wait between attempts.
    pub min_delay: Duration,
    /// Longest wait between attempts.
    pub max_delay: Duration,
    /// Whether to add up to 25% random jitter to each wait.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: 1.0,
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given number of attempts and default backoff.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// A single attempt, never retried.
    pub fn none() -> Self {
        Self::new(1)
    }

    /// Set the number of attempts.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the backoff multiplier.
    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the minimum wait.
    #[must_use]
    pub fn min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    /// Set the maximum wait.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Wait after the given failed attempt (1-based).
    ///
    /// `multiplier * 2^(attempt - 1)` seconds, clamped to
    /// `[min_delay, max_delay]`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let base = self.multiplier * 2f64.powi(exponent);
        let min = self.min_delay.as_secs_f64();
        let max = self.max_delay.as_secs_f64().max(min);
        let capped = if base.is_finite() {
            base.clamp(min, max)
        } else {
            max
        };

        let delay = if self.jitter {
            let jitter_factor = 1.0 + (rand::rng().random::<f64>() * 0.25);
            capped * jitter_factor
        } else {
            capped
        };

        Duration::from_secs_f64(delay)
    }

    /// The full wait schedule between attempts.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts.max(1))
            .map(|attempt| self.delay_after(attempt))
            .collect()
    }
}

/// Execute an async operation under a retry policy.
///
/// `operation` receives the 1-based attempt number. Errors for which
/// [`Error::is_retryable`] is false are returned immediately. After the last
/// failed attempt the final error is returned.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= max_attempts => {
                error!(
                    "{} failed after {} attempts: {}",
                    operation_name, attempt, e
                );
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    operation_name, attempt, max_attempts, e, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert!(!policy.jitter);
    }

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.schedule(),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ]
        );
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(5), Duration::from_secs(10));
        assert_eq!(policy.delay_after(40), Duration::from_secs(10));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let policy = RetryPolicy::default().jitter(true);
        for _ in 0..100 {
            let d = policy.delay_after(3);
            assert!(d >= Duration::from_secs(4));
            assert!(d <= Duration::from_secs(5));
        }
    }

    #[test]
    fn test_none_has_empty_schedule() {
        assert!(RetryPolicy::none().schedule().is_empty());
    }

    #[tokio::test]
    async fn test_with_retry_immediate_success() {
        let result = with_retry(&RetryPolicy::default(), "test", |_| async {
            Ok::<_, Error>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_eventual_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let result: Result<u32> = with_retry(&RetryPolicy::default(), "test", |attempt| {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(Error::persistence("database unavailable"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Waited 2s + 2s
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(4) && waited < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_all_fail() {
        let attempts = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let result: Result<()> = with_retry(&RetryPolicy::default(), "test", |_| {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::persistence("database unavailable"))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::PersistenceFailure(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        // 2 + 2 + 4 + 8
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(16) && waited < Duration::from_secs(17));
    }

    #[tokio::test]
    async fn test_with_retry_non_retryable_error() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<()> = with_retry(&RetryPolicy::default(), "test", |_| {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::EmptyBatch)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
