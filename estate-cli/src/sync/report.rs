//! Sync outcomes, diagnostics and batch summaries

use chrono::{DateTime, Utc};
use colored::*;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{RowFailure, SyncError, SyncResult};
use crate::models::EntityType;

/// What happened to one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    Created,
    Updated,
    /// Source identical to the last write; only the sync timestamp moved
    Unchanged,
    /// Blank business number
    Skipped,
}

impl std::fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RowOutcome::Created => "created",
            RowOutcome::Updated => "updated",
            RowOutcome::Unchanged => "unchanged",
            RowOutcome::Skipped => "skipped",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Property type outside land / detached house / apartment, stored as typed
    UnknownPropertyType,
    /// Field failed normalization and was left unset
    InvalidField,
    /// A manual edit in the store was replaced by the sheet value
    ConflictOverwritten,
    /// A manual edit in the store was kept and the sheet value dropped
    ConflictPreserved,
}

/// Non-fatal finding attached to a row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub business_number: String,
    pub field: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        business_number: impl Into<String>,
        field: impl Into<String>,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            business_number: business_number.into(),
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Result of syncing a single row
#[derive(Debug, Clone, Serialize)]
pub struct RowReport {
    pub business_number: String,
    pub row_number: usize,
    pub outcome: RowOutcome,
    pub diagnostics: Vec<Diagnostic>,
}

/// Summary of a batch sync
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub entity: EntityType,
    pub dry_run: bool,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failures: Vec<RowFailure>,
    pub diagnostics: Vec<Diagnostic>,
    /// Stopped early; rows never started are not counted
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    pub fn new(run_id: Uuid, entity: EntityType, dry_run: bool) -> Self {
        Self {
            run_id,
            entity,
            dry_run,
            created: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            failures: Vec::new(),
            diagnostics: Vec::new(),
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_row(&mut self, row: RowReport) {
        self.record_outcome(row.outcome);
        self.diagnostics.extend(row.diagnostics);
    }

    pub fn record_outcome(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Created => self.created += 1,
            RowOutcome::Updated => self.updated += 1,
            RowOutcome::Unchanged => self.unchanged += 1,
            RowOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn record_failure(&mut self, failure: RowFailure) {
        self.failures.push(failure);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Rows written or confirmed unchanged
    pub fn succeeded(&self) -> usize {
        self.created + self.updated + self.unchanged
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Rows looked at, including skipped and failed ones
    pub fn total(&self) -> usize {
        self.succeeded() + self.skipped + self.failed()
    }

    pub fn failed_business_numbers(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|f| f.business_number.as_str())
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// `Err(PartialSync)` when any row failed
    pub fn into_result(self) -> SyncResult<SyncReport> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        Err(SyncError::PartialSync {
            total: self.total(),
            succeeded: self.succeeded(),
            failures: self.failures,
        })
    }

    pub fn print_summary(&self) {
        let title = if self.dry_run {
            format!("Sync summary ({}, dry run)", self.entity)
        } else {
            format!("Sync summary ({})", self.entity)
        };
        println!("{}", title.bold());
        println!("  Run:        {}", self.run_id.to_string().dimmed());
        println!("  Succeeded:  {}", self.succeeded().to_string().green());
        println!(
            "              {} created, {} updated, {} unchanged",
            self.created, self.updated, self.unchanged
        );
        if self.skipped > 0 {
            println!("  Skipped:    {}", self.skipped.to_string().yellow());
        }
        if self.failed() > 0 {
            println!("  Failed:     {}", self.failed().to_string().red().bold());
            for failure in &self.failures {
                println!(
                    "    {} (row {}) [{}] {}",
                    failure.business_number.red(),
                    failure.row_number,
                    failure.kind,
                    failure.message
                );
            }
        } else {
            println!("  Failed:     0");
        }
        if !self.diagnostics.is_empty() {
            println!("  Diagnostics: {}", self.diagnostics.len().to_string().yellow());
            for diagnostic in &self.diagnostics {
                println!(
                    "    {} {}: {}",
                    diagnostic.business_number.yellow(),
                    diagnostic.field,
                    diagnostic.message
                );
            }
        }
        if self.cancelled {
            println!("  {}", "Cancelled before all rows were processed".yellow());
        }
        if let Some(finished) = self.finished_at {
            let elapsed = finished - self.started_at;
            println!("  Elapsed:    {:.2}s", elapsed.num_milliseconds() as f64 / 1000.0);
        }
    }
}
