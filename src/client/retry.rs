//! Retry Policy
//!
//! Caller-chosen retry-or-abort behaviour for transport failures on the primary path.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;

/// Exponential backoff with jitter, applied only to retryable errors.
///
/// One attempt (the default) means abort on the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Fail on the first error.
    pub fn abort() -> Self {
        Self::default()
    }

    /// Up to `attempts` tries in total.
    pub fn with_attempts(attempts: usize) -> Self {
        Self {
            attempts: attempts.max(1),
            ..Self::default()
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or attempts run out.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut delay = self.initial_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let jitter = Duration::from_millis(rand::random::<u64>() % 50);
                    debug!("Attempt {} of {} failed: {}", attempt, attempts, e);
                    tokio::time::sleep(delay + jitter).await;
                    delay = (delay * 2).min(self.max_backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            initial_backoff: Duration::from_millis(150),
            max_backoff: Duration::from_millis(1200),
        }
    }
}
