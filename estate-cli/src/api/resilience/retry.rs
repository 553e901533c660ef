//! Retry policy with exponential backoff
//!
//! Only errors classified as transient by [`SyncError::is_retryable`] are
//! retried. Everything else, including authentication failures, returns on
//! the first attempt.

use log::{debug, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::error::{SyncError, SyncResult};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn conservative() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 3.0,
            jitter: true,
        }
    }

    pub fn aggressive() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 1.5,
            jitter: true,
        }
    }
}

/// Executes async operations under a [`RetryConfig`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Delay before retry number `attempt` (1-based), without jitter
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.config.base_delay.as_millis() as f64
            * self.config.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.config.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        if !self.config.jitter || delay.is_zero() {
            return delay;
        }
        // Up to +25% so parallel rows do not retry in lockstep
        let extra = rand::rng().random_range(0..=delay.as_millis() as u64 / 4);
        delay + Duration::from_millis(extra)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_with_jitter(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label, attempt, max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// Classify an HTTP status into the error taxonomy
pub fn error_for_status(status: u16, message: String) -> SyncError {
    match status {
        401 | 403 => SyncError::Authentication(message),
        404 => SyncError::NotFound(message),
        _ => SyncError::Api { status, message },
    }
}
