//! Local spreadsheet exports (.xlsx via calamine, .csv via the csv crate)

use calamine::{Data, Reader, Xlsx, open_workbook};
use log::{debug, info, warn};
use std::path::Path;

use super::{CellValue, StaticSheet};
use crate::error::{SyncError, SyncResult};

/// Convert a calamine cell. Native date cells keep their serial number so the
/// field mapper sees the same representation the Sheets API delivers. Formula
/// errors keep their `#REF!`-style text so typed fields fail validation
/// instead of reading as blank.
fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// Load every sheet of an `.xlsx` workbook
pub fn load_workbook<P: AsRef<Path>>(path: P) -> SyncResult<StaticSheet> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SyncError::not_found(format!("workbook {}", path.display())));
    }

    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = StaticSheet::new(path.display().to_string());

    for sheet_name in sheet_names {
        let range = workbook.worksheet_range(&sheet_name)?;
        let (first_row, first_col) = range.start().unwrap_or((0, 0));
        let grid: Vec<Vec<CellValue>> = range
            .rows()
            .enumerate()
            .map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .map(|(c, cell)| {
                        if let Data::Error(e) = cell {
                            warn!(
                                "Sheet '{}' row {} column {} holds formula error {}",
                                sheet_name,
                                first_row as usize + r + 1,
                                first_col as usize + c + 1,
                                e
                            );
                        }
                        cell_to_value(cell)
                    })
                    .collect()
            })
            .collect();
        debug!("Loaded sheet '{}' with {} grid rows", sheet_name, grid.len());
        sheets = sheets.with_grid(sheet_name, grid);
    }

    info!("Loaded workbook {}", path.display());
    Ok(sheets)
}

/// Load a `.csv` export. The file answers for every sheet name.
pub fn load_csv<P: AsRef<Path>>(path: P) -> SyncResult<StaticSheet> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SyncError::not_found(format!("CSV export {}", path.display())));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(
            record
                .iter()
                .map(|field| {
                    // Strip a UTF-8 BOM left by spreadsheet exports
                    let field = field.trim_start_matches('\u{feff}');
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    info!("Loaded CSV export {} ({} lines)", path.display(), grid.len());
    Ok(StaticSheet::new(path.display().to_string()).with_any_sheet(grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sheets::{SheetSource, SheetTarget};
    use calamine::CellErrorType;
    use std::io::Write;

    #[test]
    fn test_cell_to_value() {
        assert_eq!(cell_to_value(&Data::Empty), CellValue::Empty);
        assert_eq!(cell_to_value(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(cell_to_value(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(
            cell_to_value(&Data::String("公開中".into())),
            CellValue::Text("公開中".into())
        );
    }

    #[test]
    fn test_formula_error_cell_is_not_blank() {
        let value = cell_to_value(&Data::Error(CellErrorType::Ref));
        assert_eq!(value, CellValue::Text("#REF!".into()));
        assert!(!value.is_blank());
        assert_eq!(
            cell_to_value(&Data::Error(CellErrorType::NA)),
            CellValue::Text("#N/A".into())
        );

        // A typed field fed an error cell reports it instead of staying unset
        let err = crate::sync::mapping::values::parse_amount("price", &value).unwrap_err();
        assert!(matches!(err, SyncError::Validation { .. }));
    }

    #[test]
    fn test_missing_workbook_is_not_found() {
        let err = load_workbook("/nonexistent/estate.xlsx").unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_load_csv_export() {
        let path = std::env::temp_dir().join(format!("estate-sync-{}.csv", uuid::Uuid::new_v4()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "\u{feff}物件番号,種別,所在地").unwrap();
            writeln!(file, "AA13500,土地,大分市高崎1-1-1").unwrap();
            writeln!(file, "AA13501,マ").unwrap();
        }

        let sheet = load_csv(&path).unwrap();
        let rows = sheet
            .read_rows(&SheetTarget::new("", "物件リスト", ""))
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("物件番号").unwrap().as_text(), "AA13500");
        assert_eq!(rows[1].get("所在地"), Some(&CellValue::Empty));
    }
}
