//! Spreadsheet rows as header -> cell mappings

use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Raw cell value as delivered by the sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Convert a JSON cell from the Sheets API
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Empty,
            serde_json::Value::String(s) if s.is_empty() => CellValue::Empty,
            serde_json::Value::String(s) => CellValue::Text(s.clone()),
            serde_json::Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
            serde_json::Value::Bool(b) => CellValue::Bool(*b),
            other => CellValue::Text(other.to_string()),
        }
    }

    /// Whether the cell is blank (missing, empty or whitespace only)
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Cell rendered as text. Empty cells render as an empty string and whole
    /// numbers render without a fractional part.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// One data row of a sheet
///
/// Every header of the sheet is present in the row; cells missing at the end
/// of a short row read as [`CellValue::Empty`].
#[derive(Debug, Clone, Serialize)]
pub struct SpreadsheetRow {
    /// 1-based row number in the sheet (the header is row 1)
    pub row_number: usize,
    #[serde(skip)]
    headers: Arc<Vec<String>>,
    cells: Vec<CellValue>,
}

impl SpreadsheetRow {
    pub fn new(row_number: usize, headers: Arc<Vec<String>>, mut cells: Vec<CellValue>) -> Self {
        cells.resize(headers.len(), CellValue::Empty);
        Self {
            row_number,
            headers,
            cells,
        }
    }

    /// Cell for a header, or `None` if the sheet has no such column
    pub fn get(&self, header: &str) -> Option<&CellValue> {
        let idx = self.headers.iter().position(|h| h == header)?;
        Some(self.cells.get(idx).unwrap_or(&EMPTY_CELL))
    }

    /// Cell for a header, comparing headers with whitespace and line breaks removed
    pub fn get_normalized(&self, header: &str) -> Option<&CellValue> {
        let wanted = normalize_header(header);
        let idx = self
            .headers
            .iter()
            .position(|h| normalize_header(h) == wanted)?;
        Some(self.cells.get(idx).unwrap_or(&EMPTY_CELL))
    }

    /// First-column cell, which carries the business number
    pub fn first(&self) -> &CellValue {
        self.cells.first().unwrap_or(&EMPTY_CELL)
    }

    /// Business number from the first column, trimmed
    pub fn key(&self) -> String {
        self.first().as_text().trim().to_string()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// (header, cell) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.headers
            .iter()
            .map(|h| h.as_str())
            .zip(self.cells.iter())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_blank)
    }
}

/// Header comparison key: all whitespace (including full-width spaces and
/// line breaks inside header cells) removed
pub fn normalize_header(header: &str) -> String {
    header.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Convert a raw grid (first row = headers) into data rows
///
/// Fully blank rows are dropped. Duplicate headers keep their first column;
/// later duplicates are renamed with a `#n` suffix so lookups stay unambiguous.
pub fn rows_from_grid(grid: Vec<Vec<CellValue>>) -> Vec<SpreadsheetRow> {
    let mut grid = grid.into_iter();
    let header_cells = match grid.next() {
        Some(cells) => cells,
        None => return Vec::new(),
    };

    let mut seen: HashMap<String, usize> = HashMap::new();
    let headers: Vec<String> = header_cells
        .iter()
        .map(|cell| {
            let name = cell.as_text().trim().to_string();
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count > 1 && !name.is_empty() {
                warn!("Duplicate sheet header '{}', keeping the first column", name);
                format!("{}#{}", name, count)
            } else {
                name
            }
        })
        .collect();
    let headers = Arc::new(headers);

    grid.enumerate()
        .map(|(idx, cells)| SpreadsheetRow::new(idx + 2, headers.clone(), cells))
        .filter(|row| !row.is_blank())
        .collect()
}

/// Business number -> position in a row list, built once per batch
#[derive(Debug, Default)]
pub struct RowIndex {
    positions: HashMap<String, usize>,
    duplicates: Vec<String>,
}

impl RowIndex {
    pub fn build(rows: &[SpreadsheetRow]) -> Self {
        let mut index = RowIndex::default();
        for (pos, row) in rows.iter().enumerate() {
            let key = row.key();
            if key.is_empty() {
                continue;
            }
            if index.positions.contains_key(&key) {
                index.duplicates.push(key);
            } else {
                index.positions.insert(key, pos);
            }
        }
        index
    }

    /// Position of the first row carrying `key`
    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Business numbers that appear more than once
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }
}
