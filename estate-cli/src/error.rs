//! Error taxonomy for the sync pipeline
//!
//! Reader, mapper, store and sync service all return [`SyncError`]. The CLI
//! layer wraps it in `anyhow` with context.

use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the sync pipeline
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Credential invalid, expired or lacking permission
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Record, sheet, range or row absent
    #[error("not found: {0}")]
    NotFound(String),

    /// A field failed normalization
    #[error("invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Some rows of a batch failed, the rest were written
    #[error("{} of {total} rows failed to sync ({succeeded} succeeded)", failures.len())]
    PartialSync {
        total: usize,
        succeeded: usize,
        failures: Vec<RowFailure>,
    },

    /// Non-success HTTP response that is not an auth or not-found condition
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Connection, timeout or body decoding failure
    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("sync state database error: {0}")]
    State(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("workbook error: {0}")]
    Workbook(String),
}

impl SyncError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Transient failures worth retrying: transport errors, 429 and 5xx
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Short machine-friendly name of the error class
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Authentication(_) => FailureKind::Authentication,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::Validation { .. } => FailureKind::Validation,
            Self::PartialSync { .. } => FailureKind::PartialSync,
            Self::Api { .. } | Self::Transport(_) => FailureKind::Remote,
            _ => FailureKind::Internal,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            SyncError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

impl From<calamine::XlsxError> for SyncError {
    fn from(err: calamine::XlsxError) -> Self {
        SyncError::Workbook(err.to_string())
    }
}

impl From<csv::Error> for SyncError {
    fn from(err: csv::Error) -> Self {
        SyncError::Workbook(err.to_string())
    }
}

/// Error class recorded against a failed row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Authentication,
    NotFound,
    Validation,
    PartialSync,
    Duplicate,
    Remote,
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::Authentication => "auth",
            FailureKind::NotFound => "not-found",
            FailureKind::Validation => "validation",
            FailureKind::PartialSync => "partial",
            FailureKind::Duplicate => "duplicate",
            FailureKind::Remote => "remote",
            FailureKind::Internal => "internal",
        };
        write!(f, "{}", label)
    }
}

/// One row that failed during a batch sync
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub business_number: String,
    /// 1-based row number in the sheet
    pub row_number: usize,
    pub kind: FailureKind,
    pub message: String,
}

impl RowFailure {
    pub fn from_error(business_number: &str, row_number: usize, err: &SyncError) -> Self {
        Self {
            business_number: business_number.to_string(),
            row_number,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SyncError::Transport("timeout".into()).is_retryable());
        assert!(
            SyncError::Api {
                status: 503,
                message: "unavailable".into()
            }
            .is_retryable()
        );
        assert!(
            SyncError::Api {
                status: 429,
                message: "slow down".into()
            }
            .is_retryable()
        );
        assert!(
            !SyncError::Api {
                status: 400,
                message: "bad".into()
            }
            .is_retryable()
        );
        assert!(!SyncError::Authentication("expired".into()).is_retryable());
        assert!(!SyncError::validation("inquiry_date", "negative serial").is_retryable());
    }

    #[test]
    fn test_partial_sync_message() {
        let err = SyncError::PartialSync {
            total: 10,
            succeeded: 9,
            failures: vec![RowFailure {
                business_number: "AA13505".into(),
                row_number: 6,
                kind: FailureKind::Validation,
                message: "bad date".into(),
            }],
        };
        assert_eq!(err.to_string(), "1 of 10 rows failed to sync (9 succeeded)");
        assert_eq!(err.kind(), FailureKind::PartialSync);
    }
}
