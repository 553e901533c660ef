//! Resilience for outbound calls
//!
//! Request timeouts, retry with backoff and concurrency limiting for the
//! Sheets API and the record store.

pub mod concurrency;
pub mod config;
pub mod retry;

pub use concurrency::ConcurrencyLimiter;
pub use config::{ConcurrencyConfig, ResilienceConfig, ResilienceSettings};
pub use retry::{RetryConfig, RetryPolicy, error_for_status};
