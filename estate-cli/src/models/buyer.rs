use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::PropertyType;

/// A registered buyer and their search criteria
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuyerRecord {
    pub buyer_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reception_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_status: Option<String>,
    /// Desired areas, one entry per comma-separated item in the sheet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_areas: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_property_types: Option<Vec<PropertyType>>,
    /// Budget in yen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_call_date: Option<NaiveDate>,
    /// Property the buyer first inquired about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inquiry_property_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}
