//! Property listings and the property-type vocabulary

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Listed property identified by e.g. "AA13500"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub property_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Listing status as typed in the sheet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Badge derived from `status`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_category: Option<PropertyBadge>,
    /// Asking price in yen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_areas: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Property type. Anything outside the three known kinds is kept verbatim in
/// `Other` so data-entry mistakes survive into the store and can be found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyType {
    Land,
    DetachedHouse,
    Apartment,
    Other(String),
}

impl PropertyType {
    /// Parse sheet text. Accepts the canonical names, the Japanese labels and
    /// the one-character abbreviations used on the intake sheets.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "land" | "土地" | "土" => PropertyType::Land,
            "detached_house" | "戸建" | "戸建て" | "一戸建て" | "戸" => {
                PropertyType::DetachedHouse
            }
            "apartment" | "マンション" | "マ" | "区分マンション" => PropertyType::Apartment,
            _ => PropertyType::Other(trimmed.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, PropertyType::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            PropertyType::Land => "land",
            PropertyType::DetachedHouse => "detached_house",
            PropertyType::Apartment => "apartment",
            PropertyType::Other(raw) => raw,
        }
    }
}

impl From<String> for PropertyType {
    fn from(value: String) -> Self {
        PropertyType::parse(&value)
    }
}

impl From<PropertyType> for String {
    fn from(value: PropertyType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publication badge shown on listing screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyBadge {
    Published,
    PrePublication,
    Private,
    UnpublishedOrSold,
}

impl PropertyBadge {
    pub fn label(&self) -> &'static str {
        match self {
            PropertyBadge::Published => "公開中",
            PropertyBadge::PrePublication => "公開前",
            PropertyBadge::Private => "非公開",
            PropertyBadge::UnpublishedOrSold => "非公開/成約済",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_parse() {
        assert_eq!(PropertyType::parse("土地"), PropertyType::Land);
        assert_eq!(PropertyType::parse(" 戸 "), PropertyType::DetachedHouse);
        assert_eq!(PropertyType::parse("マンション"), PropertyType::Apartment);
        assert_eq!(PropertyType::parse("apartment"), PropertyType::Apartment);
        assert_eq!(
            PropertyType::parse("倉庫"),
            PropertyType::Other("倉庫".to_string())
        );
    }

    #[test]
    fn test_unknown_type_round_trips_verbatim() {
        let value = serde_json::to_value(PropertyType::Other("収益物件".into())).unwrap();
        assert_eq!(value, "収益物件");

        let parsed: PropertyType = serde_json::from_value(value).unwrap();
        assert!(!parsed.is_known());
        assert_eq!(parsed.as_str(), "収益物件");
    }

    #[test]
    fn test_known_type_wire_value() {
        let value = serde_json::to_value(PropertyType::DetachedHouse).unwrap();
        assert_eq!(value, "detached_house");
    }

    #[test]
    fn test_badge_wire_value() {
        let value = serde_json::to_value(PropertyBadge::UnpublishedOrSold).unwrap();
        assert_eq!(value, "unpublished_or_sold");
    }
}
