//! Bounded retry with exponential backoff
//!
//! Every failure is retried the same way: a 400 from a node costs as many
//! attempts as a refused connection.

use crate::common::ClusterConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry policy wrapped around each remote call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffRetrier {
    max_attempts: u32,
    base_delay: Duration,
}

impl BackoffRetrier {
    /// `max_attempts` counts the first try; zero is treated as one.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep after failed attempt `attempt` (zero-based): `delay * 2^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `op` until it succeeds or the attempts run out.
    ///
    /// The first success is returned unchanged; after the last failed
    /// attempt that attempt's error is returned. No sleep follows the
    /// final attempt.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 >= self.max_attempts => {
                    tracing::debug!(attempts = attempt + 1, error = %e, "giving up on remote call");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "remote call failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for BackoffRetrier {
    fn default() -> Self {
        Self::from_config(&ClusterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_backoff_schedule() {
        let retrier = BackoffRetrier::new(4, Duration::from_millis(100));
        assert_eq!(retrier.delay_for(0), Duration::from_millis(100));
        assert_eq!(retrier.delay_for(1), Duration::from_millis(200));
        assert_eq!(retrier.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(BackoffRetrier::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let retrier = BackoffRetrier::new(3, Duration::from_secs(1));
        assert_eq!(retrier.delay_for(64), Duration::from_secs(u64::from(u32::MAX)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_does_not_sleep() {
        let retrier = BackoffRetrier::new(3, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<&str, String> = retrier
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("done")
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_failures() {
        let retrier = BackoffRetrier::new(3, Duration::from_millis(100));
        let calls = AtomicU32::new(0);

        let result: Result<u32, String> = retrier
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("attempt {} refused", n))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let retrier = BackoffRetrier::new(3, Duration::from_millis(100));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), String> = retrier
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("failure {}", n))
            })
            .await;

        assert_eq!(result.unwrap_err(), "failure 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms + 200ms, nothing after the last attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(400));
    }
}
