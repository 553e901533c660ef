//! Output formatting for list-style commands

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::{Map, Value};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Render a JSON value as a cell: strings unquoted, lists comma-joined,
/// null as empty
pub fn json_value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(json_value_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Pad to a display width; full-width characters count double
fn pad(s: &str, width: usize) -> String {
    let shown = UnicodeWidthStr::width(s);
    format!("{}{}", s, " ".repeat(width.saturating_sub(shown)))
}

fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('…');
    out
}

const MAX_CELL_WIDTH: usize = 40;

/// Plain-text table aligned on display width
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return "No rows\n".to_string();
    }

    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| truncate(&cell.replace('\n', " "), MAX_CELL_WIDTH)).collect())
        .collect();
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| UnicodeWidthStr::width(cell.as_str()))
                .chain(std::iter::once(UnicodeWidthStr::width(header.as_str())))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let line = |cells: &[String]| -> String {
        widths
            .iter()
            .enumerate()
            .map(|(i, w)| pad(cells.get(i).map(String::as_str).unwrap_or(""), *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    out.push_str(&line(headers));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    out.push('\n');
    for row in &rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

pub fn render_csv(headers: &[String], rows: &[Vec<String>]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers).context("Failed to write CSV header")?;
    for row in rows {
        writer.write_record(row).context("Failed to write CSV row")?;
    }
    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Render JSON objects. Table output is limited to `columns` (all keys when
/// empty); JSON output always carries the full objects.
pub fn format_objects(
    objects: &[Map<String, Value>],
    columns: &[&str],
    format: OutputFormat,
) -> Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(objects).context("Failed to format JSON output");
    }

    let headers: Vec<String> = if columns.is_empty() || format == OutputFormat::Csv {
        let mut keys: Vec<String> = Vec::new();
        for object in objects {
            for key in object.keys() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
        keys
    } else {
        columns.iter().map(|c| c.to_string()).collect()
    };
    let rows: Vec<Vec<String>> = objects
        .iter()
        .map(|object| {
            headers
                .iter()
                .map(|h| json_value_to_string(object.get(h).unwrap_or(&Value::Null)))
                .collect()
        })
        .collect();

    match format {
        OutputFormat::Csv => render_csv(&headers, &rows),
        _ => Ok(render_table(&headers, &rows)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_table_aligns_full_width_text() {
        let table = render_table(
            &["番号".to_string(), "name".to_string()],
            &[
                vec!["AA1".to_string(), "山田".to_string()],
                vec!["AA13500".to_string(), "x".to_string()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "番号     name");
        assert_eq!(lines[2], "AA1      山田");
        assert_eq!(lines[3], "AA13500  x");
    }

    #[test]
    fn test_truncate_long_cells() {
        let long = "あ".repeat(30);
        let cut = truncate(&long, 10);
        assert!(UnicodeWidthStr::width(cut.as_str()) <= 10);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_csv_quotes_commas() {
        let objects = vec![object(json!({"buyer_number": "1", "desired_areas": ["高崎", "明野"]}))];
        let csv = format_objects(&objects, &[], OutputFormat::Csv).unwrap();
        assert_eq!(csv, "buyer_number,desired_areas\n1,\"高崎, 明野\"\n");
    }

    #[test]
    fn test_table_uses_selected_columns() {
        let objects = vec![object(json!({"a": 1, "b": "x", "c": null}))];
        let table = format_objects(&objects, &["b", "c"], OutputFormat::Table).unwrap();
        assert!(table.starts_with("b  c"));
        assert!(!table.contains('1'));
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render_table(&["a".to_string()], &[]), "No rows\n");
    }
}
