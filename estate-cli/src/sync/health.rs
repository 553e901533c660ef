//! Auto-sync health check
//!
//! Compares one sheet against the store without writing anything: rows not
//! yet in the store, store records no longer on the sheet, and fields that
//! drifted apart.

use colored::*;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::service::SyncService;
use crate::api::sheets::RowIndex;
use crate::api::store::ListFilter;
use crate::error::{RowFailure, SyncResult};
use crate::models::{EntityType, FieldDiff, Record};

#[derive(Debug, Clone, Serialize)]
pub struct RecordDrift {
    pub business_number: String,
    /// `left` is the normalized sheet value, `right` the stored one
    pub fields: Vec<FieldDiff>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub entity: EntityType,
    pub sheet_rows: usize,
    pub store_records: usize,
    pub missing_in_store: Vec<String>,
    /// Reported only; the sync never deletes
    pub missing_in_sheet: Vec<String>,
    pub drift: Vec<RecordDrift>,
    pub duplicates: Vec<String>,
    pub unmappable: Vec<RowFailure>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.missing_in_store.is_empty()
            && self.drift.is_empty()
            && self.duplicates.is_empty()
            && self.unmappable.is_empty()
    }

    pub fn print(&self) {
        println!("{}", format!("Health check ({})", self.entity).bold());
        println!("  Sheet rows:        {}", self.sheet_rows);
        println!("  Store records:     {}", self.store_records);

        print_list("Missing in store", &self.missing_in_store, |s| s.red().to_string());
        print_list("Not on the sheet", &self.missing_in_sheet, |s| s.yellow().to_string());
        print_list("Duplicate numbers", &self.duplicates, |s| s.red().to_string());

        if !self.unmappable.is_empty() {
            println!("  Unmappable rows:   {}", self.unmappable.len().to_string().red());
            for failure in &self.unmappable {
                println!("    {} (row {}): {}", failure.business_number, failure.row_number, failure.message);
            }
        }

        if self.drift.is_empty() {
            println!("  Drifted records:   0");
        } else {
            println!("  Drifted records:   {}", self.drift.len().to_string().yellow());
            for drift in &self.drift {
                println!("    {}", drift.business_number.yellow());
                for diff in &drift.fields {
                    println!("      {}: sheet {} / store {}", diff.field, diff.left, diff.right);
                }
            }
        }

        if self.is_healthy() {
            println!("  {}", "In sync".green());
        }
    }
}

fn print_list(title: &str, items: &[String], paint: impl Fn(&str) -> String) {
    println!("  {:<18} {}", format!("{}:", title), items.len());
    for item in items {
        println!("    {}", paint(item));
    }
}

/// Sheet-side fields whose stored value differs
fn drifted_fields(sheet: &Record, stored: &Record) -> SyncResult<Vec<FieldDiff>> {
    let stored = stored.to_json_map()?;
    Ok(sheet
        .to_json_map()?
        .into_iter()
        .filter_map(|(field, value)| {
            let current = stored.get(&field).cloned().unwrap_or(Value::Null);
            (current != value).then_some(FieldDiff {
                field,
                left: value,
                right: current,
            })
        })
        .collect())
}

impl SyncService {
    pub async fn check(&self, entity: EntityType) -> SyncResult<HealthReport> {
        let rows = self.read_rows(entity).await?;
        let index = RowIndex::build(&rows);
        let records = self.store().list(entity, &ListFilter::active()).await?;

        let stored: HashMap<&str, &Record> = records
            .iter()
            .map(|record| (record.business_number(), record))
            .collect();

        let mut report = HealthReport {
            entity,
            sheet_rows: index.len(),
            store_records: records.len(),
            missing_in_store: Vec::new(),
            missing_in_sheet: Vec::new(),
            drift: Vec::new(),
            duplicates: index.duplicates().to_vec(),
            unmappable: Vec::new(),
        };

        for (pos, row) in rows.iter().enumerate() {
            let key = row.key();
            if key.is_empty() || index.position(&key) != Some(pos) {
                continue;
            }
            let Some(current) = stored.get(key.as_str()) else {
                report.missing_in_store.push(key);
                continue;
            };
            let mapped = match self.mapper().map_row(entity, row) {
                Ok(mapped) => mapped,
                Err(err) => {
                    report.unmappable.push(RowFailure::from_error(&key, row.row_number, &err));
                    continue;
                }
            };
            for error in &mapped.field_errors {
                report
                    .unmappable
                    .push(RowFailure::from_error(&key, row.row_number, &error.to_error()));
            }
            let fields = drifted_fields(&mapped.record, current)?;
            if !fields.is_empty() {
                report.drift.push(RecordDrift {
                    business_number: key,
                    fields,
                });
            }
        }

        report.missing_in_sheet = records
            .iter()
            .map(|record| record.business_number())
            .filter(|number| !index.contains(number))
            .map(str::to_string)
            .collect();

        info!(
            "Health check {}: {} missing in store, {} not on sheet, {} drifted",
            entity,
            report.missing_in_store.len(),
            report.missing_in_sheet.len(),
            report.drift.len()
        );
        Ok(report)
    }
}
