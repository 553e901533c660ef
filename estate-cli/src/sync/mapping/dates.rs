//! Spreadsheet date handling
//!
//! Sheets store dates as a day count from 1899-12-30. Cells can also hold
//! typed text in a handful of local formats.

use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;

use crate::api::sheets::CellValue;
use crate::error::{SyncError, SyncResult};

/// Day zero of the spreadsheet serial date system
pub const SERIAL_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1899, 12, 30) {
    Some(date) => date,
    None => panic!("invalid serial epoch"),
};

const TEXT_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

/// Calendar date for a whole-day serial
pub fn serial_to_date(serial: i64) -> SyncResult<NaiveDate> {
    if serial < 0 {
        return Err(SyncError::validation(
            "date",
            format!("negative date serial {}", serial),
        ));
    }
    Duration::try_days(serial)
        .and_then(|days| SERIAL_EPOCH.checked_add_signed(days))
        .ok_or_else(|| SyncError::validation("date", format!("date serial {} out of range", serial)))
}

/// Calendar date for a serial with a time-of-day fraction
///
/// The fraction is a local time in the sheet's timezone, so flooring it
/// yields the local calendar date.
pub fn serial_to_date_f64(serial: f64) -> SyncResult<NaiveDate> {
    if !serial.is_finite() {
        return Err(SyncError::validation("date", "date serial is not a finite number"));
    }
    let days = serial.floor();
    if days < 0.0 {
        return Err(SyncError::validation(
            "date",
            format!("negative date serial {}", serial),
        ));
    }
    if days > i64::MAX as f64 {
        return Err(SyncError::validation("date", format!("date serial {} out of range", serial)));
    }
    serial_to_date(days as i64)
}

pub fn date_to_serial(date: NaiveDate) -> i64 {
    date.signed_duration_since(SERIAL_EPOCH).num_days()
}

/// Parse a date cell. Blank cells give `Ok(None)`.
pub fn parse_date_cell(field: &str, cell: &CellValue, tz: Tz) -> SyncResult<Option<NaiveDate>> {
    let parsed = match cell {
        CellValue::Empty => return Ok(None),
        CellValue::Number(n) => serial_to_date_f64(*n),
        CellValue::Bool(b) => Err(SyncError::validation("date", format!("'{}' is not a date", b))),
        CellValue::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            parse_date_text(text, tz)
        }
    };
    parsed.map(Some).map_err(|err| relabel(err, field))
}

fn parse_date_text(text: &str, tz: Tz) -> SyncResult<NaiveDate> {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    if !unsigned.is_empty() && unsigned.chars().all(|c| c.is_ascii_digit()) {
        let serial: i64 = text
            .parse()
            .map_err(|_| SyncError::validation("date", format!("date serial '{}' out of range", text)))?;
        return serial_to_date(serial);
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Ok(timestamp.with_timezone(&tz).date_naive());
    }

    // "2024/03/05 10:30" and the like: the date part is enough
    let date_part = text.split_whitespace().next().unwrap_or(text);
    TEXT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .ok_or_else(|| SyncError::validation("date", format!("unrecognized date '{}'", text)))
}

fn relabel(err: SyncError, field: &str) -> SyncError {
    match err {
        SyncError::Validation { message, .. } => SyncError::validation(field, message),
        other => other,
    }
}
