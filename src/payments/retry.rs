use std::{future::Future, time::Duration};

use anyhow::Result;
use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

/// Exponential backoff for calls to external services.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first call included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub add_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            add_jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            add_jitter: false,
        }
    }

    /// `base_delay * 2^attempt`, capped at `max_delay`, plus up to 25% jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt);
        let delay = self
            .base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay);

        if !self.add_jitter {
            return delay;
        }

        let jitter_range = delay.as_millis() as u64 / 4;
        if jitter_range == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_range))
    }

    /// Runs `operation` until it succeeds, attempts run out, or it fails with
    /// an error `should_retry` rejects.
    pub async fn run<T, F, Fut, R>(&self, context: &str, should_retry: R, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        R: Fn(&anyhow::Error) -> bool,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 < self.max_attempts && should_retry(&err) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        context,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = ?err,
                        "retry: attempt failed, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
