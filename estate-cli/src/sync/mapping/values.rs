//! Value parsing for sheet cells

use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::sheets::CellValue;
use crate::error::{SyncError, SyncResult};

static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[,、，]").unwrap_or_else(|_| unreachable!("separator pattern is a literal"))
});

/// Full-width digits and signs as typed with a Japanese IME, folded to ASCII
pub fn to_half_width(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '．' => '.',
            '－' | 'ー' => '-',
            '，' => ',',
            _ => c,
        })
        .collect()
}

/// Trimmed text, `None` when blank
pub fn parse_text(cell: &CellValue) -> Option<String> {
    let text = cell.as_text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Amount in yen. Accepts "12,800,000", "1280万", "1,280万円", "¥500".
pub fn parse_amount(field: &str, cell: &CellValue) -> SyncResult<Option<i64>> {
    let text = match cell {
        CellValue::Empty => return Ok(None),
        CellValue::Number(n) => return checked_amount(field, *n, &cell.as_text()).map(Some),
        CellValue::Bool(_) => {
            return Err(SyncError::validation(field, format!("'{}' is not an amount", cell.as_text())));
        }
        CellValue::Text(text) => to_half_width(text),
    };

    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, ',' | '円' | '¥' | '￥'))
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }

    let (digits, multiplier) = match cleaned.strip_suffix('万') {
        Some(rest) => (rest, 10_000.0),
        None => (cleaned.as_str(), 1.0),
    };
    let value: f64 = digits
        .parse()
        .map_err(|_| SyncError::validation(field, format!("'{}' is not an amount", text.trim())))?;
    checked_amount(field, value * multiplier, text.trim()).map(Some)
}

/// Round to whole yen; anything `i64` cannot hold is rejected rather than
/// saturated
fn checked_amount(field: &str, amount: f64, shown: &str) -> SyncResult<i64> {
    let rounded = amount.round();
    if !rounded.is_finite() || rounded.abs() >= i64::MAX as f64 {
        return Err(SyncError::validation(field, format!("amount '{}' out of range", shown)));
    }
    Ok(rounded as i64)
}

/// Plain decimal number such as a coordinate
pub fn parse_decimal(field: &str, cell: &CellValue) -> SyncResult<Option<f64>> {
    match cell {
        CellValue::Empty => Ok(None),
        CellValue::Number(n) if n.is_finite() => Ok(Some(*n)),
        CellValue::Text(text) => {
            let text = to_half_width(text.trim());
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| SyncError::validation(field, format!("'{}' is not a number", text)))
        }
        other => Err(SyncError::validation(
            field,
            format!("'{}' is not a number", other.as_text()),
        )),
    }
}

/// Split a list cell on ASCII, ideographic and full-width commas
pub fn split_list(cell: &CellValue) -> Option<Vec<String>> {
    let text = cell.as_text();
    let items: Vec<String> = LIST_SEPARATOR
        .split(&text)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() { None } else { Some(items) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("price", &text("12,800,000")).unwrap(), Some(12_800_000));
        assert_eq!(parse_amount("price", &text("1280万")).unwrap(), Some(12_800_000));
        assert_eq!(parse_amount("price", &text("1,280万円")).unwrap(), Some(12_800_000));
        assert_eq!(parse_amount("price", &text("１２８０万円")).unwrap(), Some(12_800_000));
        assert_eq!(parse_amount("price", &text("1280.5万")).unwrap(), Some(12_805_000));
        assert_eq!(parse_amount("price", &text("￥500")).unwrap(), Some(500));
        assert_eq!(parse_amount("price", &CellValue::Number(980000.0)).unwrap(), Some(980000));
        assert_eq!(parse_amount("price", &CellValue::Empty).unwrap(), None);
        assert_eq!(parse_amount("price", &text(" 円 ")).unwrap(), None);
    }

    #[test]
    fn test_parse_amount_rejects_out_of_range_numbers() {
        for n in [1e19, -1e19, f64::INFINITY, f64::NAN] {
            let err = parse_amount("price", &CellValue::Number(n)).unwrap_err();
            assert!(matches!(err, SyncError::Validation { ref field, .. } if field == "price"));
        }
        assert!(parse_amount("price", &text("99999999999999999999万")).is_err());
        assert_eq!(
            parse_amount("price", &CellValue::Number(-1500.4)).unwrap(),
            Some(-1500)
        );
    }

    #[test]
    fn test_parse_amount_rejects_text() {
        match parse_amount("budget", &text("応相談")) {
            Err(SyncError::Validation { field, .. }) => assert_eq!(field, "budget"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("latitude", &text("33.2382")).unwrap(), Some(33.2382));
        assert_eq!(parse_decimal("latitude", &CellValue::Number(131.6)).unwrap(), Some(131.6));
        assert!(parse_decimal("latitude", &text("北緯33度")).is_err());
        assert!(parse_decimal("latitude", &text("NaN")).is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(&text("高崎、明野, 鶴崎，大在")).unwrap(),
            vec!["高崎", "明野", "鶴崎", "大在"]
        );
        assert_eq!(split_list(&text(" , 、")), None);
        assert_eq!(split_list(&CellValue::Empty), None);
    }

    #[test]
    fn test_parse_text_trims() {
        assert_eq!(parse_text(&text("  山田  ")), Some("山田".to_string()));
        assert_eq!(parse_text(&CellValue::Number(90.0)), Some("90".to_string()));
        assert_eq!(parse_text(&text("   ")), None);
    }
}
