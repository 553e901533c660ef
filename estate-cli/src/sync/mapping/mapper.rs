//! Sheet row -> partial record

use chrono_tz::Tz;
use log::warn;
use serde_json::{Map, Value, json};

use super::columns::{ColumnSpec, FieldKind, columns_for};
use super::{dates, values};
use crate::api::sheets::{CellValue, SpreadsheetRow};
use crate::error::{SyncError, SyncResult};
use crate::models::{EntityType, PropertyType, Record};
use crate::services::DistributionAreaCalculator;
use crate::sync::report::{Diagnostic, DiagnosticKind};
use crate::sync::status::{classify_property_status, normalize_status};

/// A field that could not be normalized and was left unset
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn to_error(&self) -> SyncError {
        SyncError::validation(&self.field, &self.message)
    }
}

/// Mapping result: the partial record plus everything noticed on the way
#[derive(Debug, Clone)]
pub struct MappedRow {
    pub record: Record,
    pub field_errors: Vec<FieldError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MappedRow {
    pub fn is_clean(&self) -> bool {
        self.field_errors.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FieldMapper {
    tz: Tz,
    areas: DistributionAreaCalculator,
}

impl FieldMapper {
    pub fn new(tz: Tz, areas: DistributionAreaCalculator) -> Self {
        Self { tz, areas }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn areas(&self) -> &DistributionAreaCalculator {
        &self.areas
    }

    /// Map one row. Only a blank business number fails the whole row; bad
    /// fields are reported in [`MappedRow::field_errors`] and left unset.
    pub fn map_row(&self, entity: EntityType, row: &SpreadsheetRow) -> SyncResult<MappedRow> {
        let business_number = row.key();
        if business_number.is_empty() {
            return Err(SyncError::validation(
                entity.key_field(),
                format!("row {} has no business number", row.row_number),
            ));
        }

        let mut fields = Map::new();
        fields.insert(entity.key_field().to_string(), json!(business_number));
        let mut field_errors = Vec::new();
        let mut diagnostics = Vec::new();

        for spec in columns_for(entity) {
            let Some(cell) = find_cell(row, spec) else {
                continue;
            };
            match self.map_cell(spec, cell, &business_number, &mut diagnostics) {
                Ok(Some(value)) => {
                    fields.insert(spec.field.to_string(), value);
                }
                Ok(None) => {}
                Err(SyncError::Validation { field, message }) => {
                    field_errors.push(FieldError { field, message });
                }
                Err(other) => return Err(other),
            }
        }

        if entity == EntityType::Property {
            self.derive_property_fields(row, &mut fields)?;
        }

        let record = Record::from_json(entity, Value::Object(fields))?;
        Ok(MappedRow {
            record,
            field_errors,
            diagnostics,
        })
    }

    fn map_cell(
        &self,
        spec: &ColumnSpec,
        cell: &CellValue,
        business_number: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> SyncResult<Option<Value>> {
        let value = match spec.kind {
            FieldKind::Text => values::parse_text(cell).map(Value::String),
            FieldKind::Status => normalize_status(&cell.as_text()).map(Value::String),
            FieldKind::Date => dates::parse_date_cell(spec.field, cell, self.tz)?
                .map(|date| json!(date.format("%Y-%m-%d").to_string())),
            FieldKind::Amount => values::parse_amount(spec.field, cell)?.map(|n| json!(n)),
            FieldKind::Decimal => values::parse_decimal(spec.field, cell)?.map(|n| json!(n)),
            FieldKind::List => values::split_list(cell).map(|items| json!(items)),
            FieldKind::PropertyType => values::parse_text(cell).map(|raw| {
                let kind = PropertyType::parse(&raw);
                flag_unknown_type(&kind, spec.field, business_number, diagnostics);
                json!(kind)
            }),
            FieldKind::PropertyTypeList => values::split_list(cell).map(|items| {
                let kinds: Vec<PropertyType> = items
                    .iter()
                    .map(|raw| PropertyType::parse(raw))
                    .collect();
                for kind in &kinds {
                    flag_unknown_type(kind, spec.field, business_number, diagnostics);
                }
                json!(kinds)
            }),
        };
        Ok(value)
    }

    /// Badge from the status and zones from the address
    fn derive_property_fields(&self, row: &SpreadsheetRow, fields: &mut Map<String, Value>) -> SyncResult<()> {
        let status = fields.get("status").and_then(Value::as_str).map(str::to_string);
        let has_status_column = columns_for(EntityType::Property)
            .iter()
            .find(|spec| spec.field == "status")
            .is_some_and(|spec| find_cell(row, spec).is_some());

        if status.is_some() || has_status_column {
            if let Some(badge) = classify_property_status(status.as_deref()) {
                fields.insert("status_category".to_string(), serde_json::to_value(badge)?);
            }
        }

        let address = fields.get("address").and_then(Value::as_str).map(str::to_string);
        if let Some(address) = address {
            let zones = self.areas.calculate(&address);
            fields.insert("distribution_areas".to_string(), json!(zones));
        }
        Ok(())
    }
}

fn find_cell<'a>(row: &'a SpreadsheetRow, spec: &ColumnSpec) -> Option<&'a CellValue> {
    spec.headers().find_map(|header| row.get_normalized(header))
}

fn flag_unknown_type(
    kind: &PropertyType,
    field: &str,
    business_number: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if kind.is_known() {
        return;
    }
    warn!(
        "{}: property type '{}' is not land, detached house or apartment; storing as typed",
        business_number, kind
    );
    diagnostics.push(Diagnostic::new(
        business_number,
        field,
        DiagnosticKind::UnknownPropertyType,
        format!("unknown property type '{}'", kind),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sheets::rows_from_grid;
    use crate::models::PropertyBadge;
    use chrono::NaiveDate;

    fn t(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn mapper() -> FieldMapper {
        FieldMapper::new(chrono_tz::Asia::Tokyo, DistributionAreaCalculator::default())
    }

    fn one_row(headers: &[&str], cells: Vec<CellValue>) -> SpreadsheetRow {
        let header_row = headers.iter().map(|h| t(h)).collect();
        rows_from_grid(vec![header_row, cells]).remove(0)
    }

    #[test]
    fn test_seller_row() {
        let row = one_row(
            &["売主番号", "名前(漢字のみ）", "反響日付", "査定額", "状況（当社）", "種別"],
            vec![
                t("AA13500"),
                t(" 山田 太郎 "),
                CellValue::Number(45356.0),
                t("1,280万円"),
                t("追客中　"),
                t("戸"),
            ],
        );
        let mapped = mapper().map_row(EntityType::Seller, &row).unwrap();
        assert!(mapped.is_clean());
        assert!(mapped.diagnostics.is_empty());

        let Record::Seller(seller) = mapped.record else {
            panic!("expected seller");
        };
        assert_eq!(seller.seller_number, "AA13500");
        assert_eq!(seller.name.as_deref(), Some("山田 太郎"));
        assert_eq!(seller.inquiry_date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(seller.valuation_amount, Some(12_800_000));
        assert_eq!(seller.status.as_deref(), Some("追客中"));
        assert_eq!(seller.property_type, Some(PropertyType::DetachedHouse));
        // No column, no field
        assert_eq!(seller.email, None);
    }

    #[test]
    fn test_bad_date_leaves_field_unset() {
        let row = one_row(
            &["売主番号", "名前", "反響日付"],
            vec![t("AA13505"), t("佐藤"), CellValue::Number(-7.0)],
        );
        let mapped = mapper().map_row(EntityType::Seller, &row).unwrap();
        assert_eq!(mapped.field_errors.len(), 1);
        assert_eq!(mapped.field_errors[0].field, "inquiry_date");

        let Record::Seller(seller) = mapped.record else {
            panic!("expected seller");
        };
        assert_eq!(seller.name.as_deref(), Some("佐藤"));
        assert_eq!(seller.inquiry_date, None);
    }

    #[test]
    fn test_blank_key_fails() {
        let row = one_row(&["売主番号", "名前"], vec![t(" "), t("佐藤")]);
        assert!(matches!(
            mapper().map_row(EntityType::Seller, &row),
            Err(SyncError::Validation { .. })
        ));
    }

    #[test]
    fn test_property_derived_fields() {
        let row = one_row(
            &["物件番号", "種別", "所在地", "状況", "売買価格"],
            vec![t("AA9001"), t("土"), t("大分市高崎2丁目"), t("専任・公開中"), t("980万")],
        );
        let mapped = mapper().map_row(EntityType::Property, &row).unwrap();
        let Record::Property(property) = mapped.record else {
            panic!("expected property");
        };
        assert_eq!(property.property_type, Some(PropertyType::Land));
        assert_eq!(property.status_category, Some(PropertyBadge::Published));
        assert_eq!(property.price, Some(9_800_000));
        assert_eq!(
            property.distribution_areas,
            Some(vec!["高崎".to_string(), "大分市全域".to_string()])
        );
    }

    #[test]
    fn test_property_blank_status_is_unpublished() {
        let row = one_row(&["物件番号", "状況"], vec![t("AA9002"), CellValue::Empty]);
        let mapped = mapper().map_row(EntityType::Property, &row).unwrap();
        let Record::Property(property) = mapped.record else {
            panic!("expected property");
        };
        assert_eq!(property.status, None);
        assert_eq!(property.status_category, Some(PropertyBadge::UnpublishedOrSold));
    }

    #[test]
    fn test_unknown_property_type_flagged_not_rejected() {
        let row = one_row(&["物件番号", "種別"], vec![t("AA9003"), t("倉庫")]);
        let mapped = mapper().map_row(EntityType::Property, &row).unwrap();
        assert!(mapped.is_clean());
        assert_eq!(mapped.diagnostics.len(), 1);
        assert_eq!(mapped.diagnostics[0].kind, DiagnosticKind::UnknownPropertyType);

        let Record::Property(property) = mapped.record else {
            panic!("expected property");
        };
        assert_eq!(property.property_type, Some(PropertyType::Other("倉庫".into())));
    }

    #[test]
    fn test_buyer_lists() {
        let row = one_row(
            &["買主番号", "★エリア", "★希望種別", "★予算"],
            vec![t("6789"), t("高崎、明野"), t("土地, マンション,店舗"), t("3000万")],
        );
        let mapped = mapper().map_row(EntityType::Buyer, &row).unwrap();
        assert_eq!(mapped.diagnostics.len(), 1);

        let Record::Buyer(buyer) = mapped.record else {
            panic!("expected buyer");
        };
        assert_eq!(buyer.buyer_number, "6789");
        assert_eq!(
            buyer.desired_areas,
            Some(vec!["高崎".to_string(), "明野".to_string()])
        );
        assert_eq!(
            buyer.desired_property_types,
            Some(vec![
                PropertyType::Land,
                PropertyType::Apartment,
                PropertyType::Other("店舗".into())
            ])
        );
        assert_eq!(buyer.budget, Some(30_000_000));
    }

    #[test]
    fn test_header_whitespace_ignored() {
        let row = one_row(&["買主番号", "●氏名 ・\n会社名"], vec![t("7001"), t("田中")]);
        let mapped = mapper().map_row(EntityType::Buyer, &row).unwrap();
        let Record::Buyer(buyer) = mapped.record else {
            panic!("expected buyer");
        };
        assert_eq!(buyer.name.as_deref(), Some("田中"));
    }
}
