//! Spreadsheet reader
//!
//! Reads a named sheet as an ordered list of rows keyed by header. Three
//! sources share the same row model: the Google Sheets API, a local `.xlsx`
//! export and a local `.csv` export.

pub mod auth;
pub mod client;
pub mod row;
pub mod workbook;

pub use auth::{ServiceAccountAuth, ServiceAccountKey};
pub use client::SheetsClient;
pub use row::{CellValue, RowIndex, SpreadsheetRow, rows_from_grid};
pub use workbook::{load_csv, load_workbook};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Which sheet (and which cells) to read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    /// A1 range without the sheet prefix, e.g. "A1:BZ"
    pub range: String,
}

impl SheetTarget {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            range: range.into(),
        }
    }

    /// "Sheet!A1:BZ" form used by the Sheets API
    pub fn a1_range(&self) -> String {
        if self.range.is_empty() {
            self.sheet_name.clone()
        } else {
            format!("{}!{}", self.sheet_name, self.range)
        }
    }
}

/// Read-only tabular data source
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Rows of the target sheet in sheet order
    async fn read_rows(&self, target: &SheetTarget) -> SyncResult<Vec<SpreadsheetRow>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Rows held in memory, keyed by sheet name
///
/// Local exports are loaded into one of these up front. A CSV export has no
/// sheet names, so it is loaded as an "any sheet" table that answers every
/// target.
#[derive(Debug, Clone, Default)]
pub struct StaticSheet {
    sheets: Vec<(String, Vec<SpreadsheetRow>)>,
    any_sheet: Option<Vec<SpreadsheetRow>>,
    origin: String,
}

impl StaticSheet {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }

    /// Add a sheet from a grid whose first row is the header
    pub fn with_grid(mut self, sheet_name: impl Into<String>, grid: Vec<Vec<CellValue>>) -> Self {
        self.sheets.push((sheet_name.into(), rows_from_grid(grid)));
        self
    }

    /// Serve the same grid for every sheet name
    pub fn with_any_sheet(mut self, grid: Vec<Vec<CellValue>>) -> Self {
        self.any_sheet = Some(rows_from_grid(grid));
        self
    }

    pub fn rows(&self, sheet_name: &str) -> Option<&[SpreadsheetRow]> {
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, rows)| rows.as_slice())
            .or(self.any_sheet.as_deref())
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }
}

#[async_trait]
impl SheetSource for StaticSheet {
    async fn read_rows(&self, target: &SheetTarget) -> SyncResult<Vec<SpreadsheetRow>> {
        self.rows(&target.sheet_name)
            .map(|rows| rows.to_vec())
            .ok_or_else(|| {
                SyncError::not_found(format!(
                    "sheet '{}' in {} (available: {})",
                    target.sheet_name,
                    self.origin,
                    self.sheet_names().join(", ")
                ))
            })
    }

    fn describe(&self) -> String {
        self.origin.clone()
    }
}
