//! External collaborators
//!
//! The spreadsheet reader and the record store, plus the resilience layer
//! both use for outbound HTTP.

pub mod resilience;
pub mod sheets;
pub mod store;

pub use resilience::{ResilienceConfig, RetryPolicy};
pub use sheets::{SheetSource, SheetTarget, SheetsClient, SpreadsheetRow};
pub use store::{DryRunStore, Filter, ListFilter, RecordStore, RestStore};

use crate::error::{SyncError, SyncResult};

/// Shared HTTP client with the configured request timeout
pub fn http_client(resilience: &ResilienceConfig) -> SyncResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(resilience.request_timeout)
        .user_agent(concat!("estate-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {}", e)))
}
