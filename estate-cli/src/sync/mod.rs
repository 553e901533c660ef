//! Spreadsheet -> store synchronization

pub mod health;
pub mod mapping;
pub mod report;
pub mod service;
pub mod status;

pub use health::HealthReport;
pub use mapping::FieldMapper;
pub use report::{Diagnostic, DiagnosticKind, RowOutcome, RowReport, SyncReport};
pub use service::{ConflictPolicy, SyncOptions, SyncService};
