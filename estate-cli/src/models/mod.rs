//! Typed record schemas shared by the field mapper and the store accessor

pub mod buyer;
pub mod property;
pub mod seller;

pub use buyer::BuyerRecord;
pub use property::{PropertyBadge, PropertyRecord, PropertyType};
pub use seller::SellerRecord;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SyncError, SyncResult};

/// The three record families kept in the store
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Seller,
    Buyer,
    Property,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [EntityType::Seller, EntityType::Buyer, EntityType::Property];

    /// Store table name
    pub fn table(&self) -> &'static str {
        match self {
            EntityType::Seller => "sellers",
            EntityType::Buyer => "buyers",
            EntityType::Property => "property_listings",
        }
    }

    /// Column holding the business number
    pub fn key_field(&self) -> &'static str {
        match self {
            EntityType::Seller => "seller_number",
            EntityType::Buyer => "buyer_number",
            EntityType::Property => "property_number",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Seller => "seller",
            EntityType::Buyer => "buyer",
            EntityType::Property => "property",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "seller" | "sellers" => Ok(EntityType::Seller),
            "buyer" | "buyers" => Ok(EntityType::Buyer),
            "property" | "properties" | "property_listings" => Ok(EntityType::Property),
            other => Err(SyncError::Config(format!("unknown entity type '{}'", other))),
        }
    }
}

/// A record of any entity type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Seller(SellerRecord),
    Buyer(BuyerRecord),
    Property(PropertyRecord),
}

impl Record {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Record::Seller(_) => EntityType::Seller,
            Record::Buyer(_) => EntityType::Buyer,
            Record::Property(_) => EntityType::Property,
        }
    }

    pub fn business_number(&self) -> &str {
        match self {
            Record::Seller(r) => &r.seller_number,
            Record::Buyer(r) => &r.buyer_number,
            Record::Property(r) => &r.property_number,
        }
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Record::Seller(r) => r.deleted_at,
            Record::Buyer(r) => r.deleted_at,
            Record::Property(r) => r.deleted_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at().is_none()
    }

    /// Record as a JSON object containing only the fields that are set
    pub fn to_json_map(&self) -> SyncResult<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(SyncError::Config(format!(
                "record serialized to non-object JSON: {}",
                other
            ))),
        }
    }

    /// Parse a JSON object (from the store or the mapper) into a typed record
    pub fn from_json(entity: EntityType, value: Value) -> SyncResult<Self> {
        Ok(match entity {
            EntityType::Seller => Record::Seller(serde_json::from_value(value)?),
            EntityType::Buyer => Record::Buyer(serde_json::from_value(value)?),
            EntityType::Property => Record::Property(serde_json::from_value(value)?),
        })
    }

    /// Overlay the fields set on `partial` onto this record
    ///
    /// Fields absent from `partial` keep their current value, which is what an
    /// upsert of a partial record does in the store.
    pub fn merged_with(&self, partial: &Record) -> SyncResult<Record> {
        if self.entity_type() != partial.entity_type() {
            return Err(SyncError::Config(format!(
                "cannot merge {} into {}",
                partial.entity_type(),
                self.entity_type()
            )));
        }
        let mut base = self.to_json_map()?;
        for (field, value) in partial.to_json_map()? {
            base.insert(field, value);
        }
        Record::from_json(self.entity_type(), Value::Object(base))
    }

    /// Fields whose values differ between two records, in `self`'s field order
    /// followed by fields only set on `other`
    pub fn diff_fields(&self, other: &Record) -> SyncResult<Vec<FieldDiff>> {
        let left = self.to_json_map()?;
        let right = other.to_json_map()?;
        let mut diffs = Vec::new();

        for (field, value) in &left {
            let other_value = right.get(field).cloned().unwrap_or(Value::Null);
            if *value != other_value {
                diffs.push(FieldDiff {
                    field: field.clone(),
                    left: value.clone(),
                    right: other_value,
                });
            }
        }
        for (field, value) in &right {
            if !left.contains_key(field) {
                diffs.push(FieldDiff {
                    field: field.clone(),
                    left: Value::Null,
                    right: value.clone(),
                });
            }
        }

        Ok(diffs)
    }
}

/// A single field difference between two records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiff {
    pub field: String,
    pub left: Value,
    pub right: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn seller(number: &str) -> SellerRecord {
        SellerRecord {
            seller_number: number.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_partial_serialization_skips_unset_fields() {
        let mut record = seller("AA13500");
        record.name = Some("山田 太郎".into());
        let map = Record::Seller(record).to_json_map().unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map["seller_number"], "AA13500");
        assert!(!map.contains_key("deleted_at"));
    }

    #[test]
    fn test_dates_serialize_as_iso() {
        let mut record = seller("AA13500");
        record.inquiry_date = NaiveDate::from_ymd_opt(2024, 3, 5);
        let map = Record::Seller(record).to_json_map().unwrap();
        assert_eq!(map["inquiry_date"], "2024-03-05");
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let mut existing = seller("AA13500");
        existing.name = Some("山田".into());
        existing.comments = Some("manual note".into());

        let mut partial = seller("AA13500");
        partial.name = Some("山田 太郎".into());

        let merged = Record::Seller(existing)
            .merged_with(&Record::Seller(partial))
            .unwrap();
        match merged {
            Record::Seller(s) => {
                assert_eq!(s.name.as_deref(), Some("山田 太郎"));
                assert_eq!(s.comments.as_deref(), Some("manual note"));
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_merge_rejects_mixed_entities() {
        let s = Record::Seller(seller("AA1"));
        let b = Record::Buyer(BuyerRecord {
            buyer_number: "1001".into(),
            ..Default::default()
        });
        assert!(s.merged_with(&b).is_err());
    }

    #[test]
    fn test_diff_fields() {
        let mut a = seller("AA1");
        a.status = Some("追客中".into());
        let mut b = seller("AA1");
        b.status = Some("専任媒介".into());
        b.assignee = Some("K".into());

        let diffs = Record::Seller(a).diff_fields(&Record::Seller(b)).unwrap();
        let fields: Vec<&str> = diffs.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["status", "assignee"]);
    }

    #[test]
    fn test_entity_type_parsing() {
        assert_eq!("sellers".parse::<EntityType>().unwrap(), EntityType::Seller);
        assert_eq!("Property".parse::<EntityType>().unwrap(), EntityType::Property);
        assert!("tenant".parse::<EntityType>().is_err());
        assert_eq!(EntityType::Property.table(), "property_listings");
        assert_eq!(EntityType::Buyer.key_field(), "buyer_number");
    }
}
