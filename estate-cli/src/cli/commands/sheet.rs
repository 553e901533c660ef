//! `sheet`: raw rows as read, before any mapping

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Map, Value};

use crate::api::sheets::SpreadsheetRow;
use crate::cli::context::AppContext;
use crate::cli::output::{OutputFormat, format_objects};
use crate::models::EntityType;

#[derive(Args)]
pub struct SheetArgs {
    pub entity: EntityType,

    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub(crate) fn row_object(row: &SpreadsheetRow) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert("row".to_string(), Value::from(row.row_number));
    for (header, cell) in row.iter() {
        object.insert(header.to_string(), Value::String(cell.as_text()));
    }
    object
}

pub async fn handle_sheet_command(ctx: &AppContext, args: SheetArgs) -> Result<()> {
    let target = ctx.sheet_target(args.entity)?;
    let source = ctx.sheet_source()?;
    let rows = source
        .read_rows(&target)
        .await
        .with_context(|| format!("Failed to read {}", target.a1_range()))?;

    let objects: Vec<Map<String, Value>> = rows.iter().take(args.limit).map(row_object).collect();
    print!("{}", format_objects(&objects, &[], args.format)?);
    if args.format == OutputFormat::Table {
        println!("{} of {} row(s) from {}", objects.len(), rows.len(), source.describe());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sheets::{CellValue, rows_from_grid};

    #[test]
    fn test_row_object_keeps_headers_and_row_number() {
        let rows = rows_from_grid(vec![
            vec![CellValue::Text("売主番号".into()), CellValue::Text("名前".into())],
            vec![CellValue::Text("AA1".into()), CellValue::Text("山田".into())],
        ]);
        let object = row_object(&rows[0]);
        assert_eq!(object["row"], Value::from(2));
        assert_eq!(object["売主番号"], Value::from("AA1"));
        assert_eq!(object["名前"], Value::from("山田"));
    }
}
