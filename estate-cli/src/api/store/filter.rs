//! List filters for the record store
//!
//! A filter renders to PostgREST query parameters for the REST store and can
//! also be evaluated against a record's JSON in memory.

use serde_json::{Map, Value};

/// Single condition on a record field
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, FilterValue),
    /// Substring match on a text field
    Contains(String, String),
    IsNull(String),
    NotNull(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl FilterValue {
    fn to_query(&self) -> String {
        match self {
            FilterValue::String(s) => s.clone(),
            FilterValue::Integer(i) => i.to_string(),
            FilterValue::Boolean(b) => b.to_string(),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FilterValue::String(s), Value::String(v)) => s == v,
            (FilterValue::Integer(i), Value::Number(n)) => n.as_i64() == Some(*i),
            (FilterValue::Boolean(b), Value::Bool(v)) => b == v,
            _ => false,
        }
    }
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq(field.into(), FilterValue::String(value.into()))
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Filter::Contains(field.into(), needle.into())
    }

    fn field(&self) -> &str {
        match self {
            Filter::Eq(f, _) | Filter::Contains(f, _) | Filter::IsNull(f) | Filter::NotNull(f) => f,
        }
    }

    /// PostgREST `(column, operator.value)` pair
    pub fn to_query_param(&self) -> (String, String) {
        let value = match self {
            Filter::Eq(_, v) => format!("eq.{}", v.to_query()),
            Filter::Contains(_, needle) => format!("like.*{}*", needle),
            Filter::IsNull(_) => "is.null".to_string(),
            Filter::NotNull(_) => "not.is.null".to_string(),
        };
        (self.field().to_string(), value)
    }

    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        let value = record.get(self.field()).unwrap_or(&Value::Null);
        match self {
            Filter::Eq(_, expected) => expected.matches(value),
            Filter::Contains(_, needle) => value.as_str().is_some_and(|s| s.contains(needle.as_str())),
            Filter::IsNull(_) => value.is_null(),
            Filter::NotNull(_) => !value.is_null(),
        }
    }
}

/// Conditions (all must hold) plus soft-delete visibility and a row limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    pub conditions: Vec<Filter>,
    pub include_deleted: bool,
    pub limit: Option<usize>,
}

impl ListFilter {
    /// Active records only
    pub fn active() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: Filter) -> Self {
        self.conditions.push(filter);
        self
    }

    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Query parameters for a PostgREST select, soft-delete condition included
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> =
            self.conditions.iter().map(Filter::to_query_param).collect();
        if !self.include_deleted {
            params.push(Filter::IsNull("deleted_at".into()).to_query_param());
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        if !self.include_deleted && !record.get("deleted_at").unwrap_or(&Value::Null).is_null() {
            return false;
        }
        self.conditions.iter().all(|c| c.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_query_params() {
        let filter = ListFilter::active()
            .with(Filter::eq("status", "公開中"))
            .with(Filter::contains("address", "高崎"))
            .limit(Some(50));

        assert_eq!(
            filter.to_query_params(),
            vec![
                ("status".to_string(), "eq.公開中".to_string()),
                ("address".to_string(), "like.*高崎*".to_string()),
                ("deleted_at".to_string(), "is.null".to_string()),
                ("limit".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn test_include_deleted_drops_soft_delete_condition() {
        let params = ListFilter::active().include_deleted(true).to_query_params();
        assert!(params.is_empty());
    }

    #[test]
    fn test_in_memory_matching() {
        let active = record(json!({"status": "追客中", "budget": 3000, "address": "大分市高崎"}));
        let deleted = record(json!({"status": "追客中", "deleted_at": "2024-01-01T00:00:00Z"}));

        let filter = ListFilter::active().with(Filter::eq("status", "追客中"));
        assert!(filter.matches(&active));
        assert!(!filter.matches(&deleted));
        assert!(filter.clone().include_deleted(true).matches(&deleted));

        assert!(Filter::Eq("budget".into(), FilterValue::Integer(3000)).matches(&active));
        assert!(Filter::contains("address", "高崎").matches(&active));
        assert!(Filter::IsNull("email".into()).matches(&active));
        assert!(!Filter::NotNull("email".into()).matches(&active));
    }
}
