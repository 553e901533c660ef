//! Sync service: sheet rows -> store records
//!
//! Rows are independent. A failure on one row is recorded and the batch moves
//! on; nothing already written is rolled back.

use clap::ValueEnum;
use futures::future;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::mapping::{FieldMapper, MappedRow};
use super::report::{Diagnostic, DiagnosticKind, RowOutcome, RowReport, SyncReport};
use crate::api::sheets::{RowIndex, SheetSource, SheetTarget, SpreadsheetRow};
use crate::api::store::{DryRunStore, RecordStore};
use crate::config::repository::{SyncState, get_sync_state, record_sync, touch_sync};
use crate::error::{FailureKind, RowFailure, SyncError, SyncResult};
use crate::models::{EntityType, Record};

/// What to do when a field was edited in the store since the last sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The sheet wins; the overwrite is reported
    #[default]
    Overwrite,
    /// The manual edit wins; the sheet value for that field is skipped
    Preserve,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Write even when the source matches the last sync
    pub force: bool,
    pub dry_run: bool,
    pub conflict_policy: ConflictPolicy,
    /// Fail rows with invalid fields instead of syncing them partially
    pub strict_validation: bool,
    pub max_parallel_rows: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            force: false,
            dry_run: false,
            conflict_policy: ConflictPolicy::Overwrite,
            strict_validation: true,
            max_parallel_rows: 4,
        }
    }
}

pub struct SyncService {
    sheets: Arc<dyn SheetSource>,
    store: Arc<dyn RecordStore>,
    state: SqlitePool,
    mapper: FieldMapper,
    targets: HashMap<EntityType, SheetTarget>,
    options: SyncOptions,
}

impl SyncService {
    /// With `options.dry_run` the store is wrapped so nothing is written
    pub fn new(
        sheets: Arc<dyn SheetSource>,
        store: Arc<dyn RecordStore>,
        state: SqlitePool,
        mapper: FieldMapper,
        targets: HashMap<EntityType, SheetTarget>,
        options: SyncOptions,
    ) -> Self {
        let store: Arc<dyn RecordStore> = if options.dry_run {
            Arc::new(DryRunStore::new(store))
        } else {
            store
        };
        Self {
            sheets,
            store,
            state,
            mapper,
            targets,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn state_pool(&self) -> &SqlitePool {
        &self.state
    }

    fn target(&self, entity: EntityType) -> SyncResult<&SheetTarget> {
        self.targets
            .get(&entity)
            .ok_or_else(|| SyncError::Config(format!("no sheet configured for {}", entity)))
    }

    pub async fn read_rows(&self, entity: EntityType) -> SyncResult<Vec<SpreadsheetRow>> {
        let target = self.target(entity)?;
        debug!("Reading {} rows from {} ({})", entity, target.a1_range(), self.sheets.describe());
        self.sheets.read_rows(target).await
    }

    /// Sheet row for a business number. The sheet has no index, so this is a
    /// scan on the first column.
    pub async fn find_row(&self, entity: EntityType, business_number: &str) -> SyncResult<SpreadsheetRow> {
        let wanted = business_number.trim();
        self.read_rows(entity)
            .await?
            .into_iter()
            .find(|row| row.key() == wanted)
            .ok_or_else(|| {
                SyncError::not_found(format!("{} {} in the {} sheet", entity, wanted, entity))
            })
    }

    /// Sync one record. Errors propagate to the caller unchanged.
    pub async fn sync_single(&self, entity: EntityType, business_number: &str) -> SyncResult<RowReport> {
        let row = self.find_row(entity, business_number).await?;
        let report = self.sync_row(entity, &row).await?;
        info!(
            "{} {}: {}{}",
            entity,
            report.business_number,
            report.outcome,
            if self.options.dry_run { " (dry run)" } else { "" }
        );
        Ok(report)
    }

    /// Sync every row of the entity's sheet
    ///
    /// Row failures land in the report. Only failing to read the sheet at all
    /// is an error here; use [`SyncReport::into_result`] to turn row failures
    /// into [`SyncError::PartialSync`].
    pub async fn sync_all(&self, entity: EntityType, cancel: CancellationToken) -> SyncResult<SyncReport> {
        let run_id = Uuid::new_v4();
        info!(
            "[{}] Syncing all {} rows from {} into {}",
            run_id,
            entity,
            self.sheets.describe(),
            self.store.describe()
        );

        let rows = self.read_rows(entity).await?;
        let index = RowIndex::build(&rows);
        let mut report = SyncReport::new(run_id, entity, self.options.dry_run);

        let mut work = Vec::with_capacity(rows.len());
        for (pos, row) in rows.into_iter().enumerate() {
            let key = row.key();
            if key.is_empty() {
                debug!("[{}] Row {} has no business number, skipping", run_id, row.row_number);
                report.record_outcome(RowOutcome::Skipped);
                continue;
            }
            if index.position(&key) != Some(pos) {
                warn!(
                    "[{}] {} appears again on row {}; only the first row is synced",
                    run_id, key, row.row_number
                );
                report.record_failure(RowFailure {
                    business_number: key.clone(),
                    row_number: row.row_number,
                    kind: FailureKind::Duplicate,
                    message: format!("business number {} already appears earlier in the sheet", key),
                });
                continue;
            }
            work.push(row);
        }

        let scheduled = work.len();
        let parallel = self.options.max_parallel_rows.max(1);
        let mut results = stream::iter(work)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|row| async move {
                let result = self.sync_row(entity, &row).await;
                (row.key(), row.row_number, result)
            })
            .buffer_unordered(parallel);

        let mut processed = 0;
        while let Some((key, row_number, result)) = results.next().await {
            processed += 1;
            match result {
                Ok(row) => report.record_row(row),
                Err(err) => {
                    warn!("[{}] {} (row {}) failed: {}", run_id, key, row_number, err);
                    report.record_failure(RowFailure::from_error(&key, row_number, &err));
                }
            }
        }

        if processed < scheduled {
            warn!(
                "[{}] Cancelled; {} of {} rows were not started",
                run_id,
                scheduled - processed,
                scheduled
            );
            report.cancelled = true;
        }
        report.finish();

        info!(
            "[{}] Finished {}: {} succeeded, {} failed, {} skipped",
            run_id,
            entity,
            report.succeeded(),
            report.failed(),
            report.skipped
        );
        Ok(report)
    }

    /// Normalize and upsert one row
    pub async fn sync_row(&self, entity: EntityType, row: &SpreadsheetRow) -> SyncResult<RowReport> {
        let MappedRow {
            record,
            field_errors,
            mut diagnostics,
        } = self.mapper.map_row(entity, row)?;
        let business_number = record.business_number().to_string();

        if let Some(first) = field_errors.first() {
            if self.options.strict_validation {
                return Err(first.to_error());
            }
            for error in &field_errors {
                warn!("{}: {} left unset: {}", business_number, error.field, error.message);
                diagnostics.push(Diagnostic::new(
                    &business_number,
                    &error.field,
                    DiagnosticKind::InvalidField,
                    &error.message,
                ));
            }
        }

        let payload = record.to_json_map()?;
        let last = get_sync_state(&self.state, entity, &business_number).await?;

        if !self.options.force {
            if let Some(state) = &last {
                if state.payload == payload {
                    debug!("{} {} unchanged since last sync", entity, business_number);
                    if !self.options.dry_run {
                        touch_sync(&self.state, entity, &business_number).await?;
                    }
                    return Ok(RowReport {
                        business_number,
                        row_number: row.row_number,
                        outcome: RowOutcome::Unchanged,
                        diagnostics,
                    });
                }
            }
        }

        let existing = self.store.get(entity, &business_number).await?;
        let mut write = payload.clone();
        if let (Some(state), Some(current)) = (&last, &existing) {
            self.resolve_conflicts(state, current, &mut write, &mut diagnostics)?;
        }

        let partial = Record::from_json(entity, Value::Object(write))?;
        self.store.upsert(&partial).await?;
        if !self.options.dry_run {
            // The full sheet payload is the baseline, preserved fields included
            record_sync(&self.state, entity, &business_number, &payload).await?;
        }

        let outcome = if existing.is_some() {
            RowOutcome::Updated
        } else {
            RowOutcome::Created
        };
        debug!("{} {} {}", entity, business_number, outcome);
        Ok(RowReport {
            business_number,
            row_number: row.row_number,
            outcome,
            diagnostics,
        })
    }

    /// A stored field that no longer equals what the last sync wrote was
    /// edited by hand. When the sheet now says something else, apply the
    /// conflict policy.
    fn resolve_conflicts(
        &self,
        state: &SyncState,
        current: &Record,
        write: &mut Map<String, Value>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> SyncResult<()> {
        let stored = current.to_json_map()?;
        let key_field = current.entity_type().key_field();
        let business_number = current.business_number();

        for (field, last_written) in &state.payload {
            if field == key_field {
                continue;
            }
            let stored_value = stored.get(field).unwrap_or(&Value::Null);
            if stored_value == last_written {
                continue;
            }
            let Some(sheet_value) = write.get(field) else {
                continue;
            };
            if sheet_value == stored_value {
                continue;
            }

            match self.options.conflict_policy {
                ConflictPolicy::Overwrite => {
                    warn!(
                        "{}: {} was edited in the store ({}); overwriting with sheet value {}",
                        business_number, field, stored_value, sheet_value
                    );
                    diagnostics.push(Diagnostic::new(
                        business_number,
                        field,
                        DiagnosticKind::ConflictOverwritten,
                        format!("manual edit {} replaced by {}", stored_value, sheet_value),
                    ));
                }
                ConflictPolicy::Preserve => {
                    info!(
                        "{}: keeping manual edit of {} ({}); sheet has {}",
                        business_number, field, stored_value, sheet_value
                    );
                    diagnostics.push(Diagnostic::new(
                        business_number,
                        field,
                        DiagnosticKind::ConflictPreserved,
                        format!("manual edit {} kept; sheet value {} not written", stored_value, sheet_value),
                    ));
                    write.remove(field);
                }
            }
        }
        Ok(())
    }
}
