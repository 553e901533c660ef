//! Concurrency limiter implementation
//!
//! Semaphore-based limiter for outbound requests, so a parallel batch sync
//! stays within the request budget of the store and the Sheets API.

use log::debug;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::config::ConcurrencyConfig;
use crate::error::{SyncError, SyncResult};

/// Semaphore-based concurrency limiter for outbound API requests
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    config: ConcurrencyConfig,
}

impl ConcurrencyLimiter {
    pub fn new(config: ConcurrencyConfig) -> Self {
        let permits = if config.enabled {
            config.max_concurrent_requests.max(1)
        } else {
            // Large but valid (Tokio's semaphore caps at 2^61-1)
            1_000_000
        };

        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            config,
        }
    }

    /// Wait for a permit. The permit is released when dropped.
    pub async fn acquire(&self) -> SyncResult<OwnedSemaphorePermit> {
        if self.config.enabled && self.semaphore.available_permits() == 0 {
            debug!(
                "Concurrency limiter: waiting for permit ({} in use)",
                self.config.max_concurrent_requests
            );
        }

        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SyncError::Transport("request limiter closed".to_string()))
    }

    pub fn available_permits(&self) -> usize {
        if !self.config.enabled {
            return usize::MAX;
        }
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, timeout};

    fn limited(max: usize) -> ConcurrencyConfig {
        ConcurrencyConfig {
            max_concurrent_requests: max,
            enabled: true,
        }
    }

    async fn acquire_now(limiter: &ConcurrencyLimiter) -> Option<OwnedSemaphorePermit> {
        timeout(Duration::from_millis(20), limiter.acquire())
            .await
            .ok()
            .map(|permit| permit.unwrap())
    }

    #[tokio::test]
    async fn test_concurrency_limiter_disabled() {
        let limiter = ConcurrencyLimiter::new(ConcurrencyConfig {
            max_concurrent_requests: 2,
            enabled: false,
        });

        let mut permits = Vec::new();
        for _ in 0..50 {
            permits.push(acquire_now(&limiter).await.unwrap());
        }
        assert_eq!(permits.len(), 50);
        assert_eq!(limiter.available_permits(), usize::MAX);
    }

    #[tokio::test]
    async fn test_concurrency_limiter_max_permits() {
        let limiter = ConcurrencyLimiter::new(limited(2));

        let p1 = acquire_now(&limiter).await;
        let p2 = acquire_now(&limiter).await;
        let p3 = acquire_now(&limiter).await;

        assert!(p1.is_some());
        assert!(p2.is_some());
        assert!(p3.is_none());

        drop(p1);
        assert!(acquire_now(&limiter).await.is_some());
    }

    #[tokio::test]
    async fn test_concurrency_limiter_acquire_waits() {
        let limiter = ConcurrencyLimiter::new(limited(1));
        let limiter_clone = limiter.clone();

        let permit = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available_permits(), 0);

        let handle = tokio::spawn(async move {
            let _permit = limiter_clone.acquire().await.unwrap();
            true
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(permit);

        let result = timeout(Duration::from_millis(200), handle).await;
        assert!(result.is_ok());
        assert_eq!(limiter.available_permits(), 1);
    }

    #[test]
    fn test_zero_request_limit_still_admits_one() {
        let limiter = ConcurrencyLimiter::new(limited(0));
        assert_eq!(limiter.available_permits(), 1);
    }
}
