//! PostgREST-style record store (hosted Postgres behind a REST gateway)

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

use super::{ListFilter, RecordStore};
use crate::api::resilience::{ConcurrencyLimiter, ResilienceConfig, RetryPolicy, error_for_status};
use crate::error::{SyncError, SyncResult};
use crate::models::{EntityType, Record};

/// Rows requested per page; the hosted gateway caps responses at 1000
const PAGE_SIZE: usize = 1000;

pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
    limiter: ConcurrencyLimiter,
    page_size: usize,
}

impl RestStore {
    /// `base_url` is the project URL; tables live under `/rest/v1/`
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http: reqwest::Client,
        resilience: &ResilienceConfig,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry: RetryPolicy::new(resilience.retry.clone()),
            limiter: ConcurrencyLimiter::new(resilience.concurrency.clone()),
            page_size: PAGE_SIZE,
        }
    }

    #[cfg(test)]
    fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn table_url(&self, entity: EntityType) -> String {
        format!("{}/rest/v1/{}", self.base_url, entity.table())
    }

    fn auth_headers(&self) -> SyncResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| SyncError::Config("store key contains invalid characters".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| SyncError::Config("store key contains invalid characters".into()))?;
        headers.insert("apikey", key);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn check(response: reqwest::Response, what: &str) -> SyncResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(
            status.as_u16(),
            format!("{} failed ({}): {}", what, status, body),
        ))
    }

    async fn fetch_rows(&self, entity: EntityType, params: &[(String, String)]) -> SyncResult<Vec<Value>> {
        let _permit = self.limiter.acquire().await?;
        let url = self.table_url(entity);
        debug!("GET {} {:?}", url, params);

        let response = self
            .http
            .get(&url)
            .headers(self.auth_headers()?)
            .query(&[("select", "*")])
            .query(params)
            .send()
            .await?;
        let response = Self::check(response, &format!("select from {}", entity.table())).await?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| SyncError::Transport(format!("invalid store response: {}", e)))
    }

    async fn post_upsert(&self, record: &Record) -> SyncResult<Vec<Value>> {
        let _permit = self.limiter.acquire().await?;
        let entity = record.entity_type();
        let payload = Value::Array(vec![Value::Object(record.to_json_map()?)]);

        let response = self
            .http
            .post(self.table_url(entity))
            .headers(self.auth_headers()?)
            .query(&[("on_conflict", entity.key_field())])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&payload)
            .send()
            .await?;
        let response = Self::check(
            response,
            &format!("upsert {} {}", entity, record.business_number()),
        )
        .await?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| SyncError::Transport(format!("invalid store response: {}", e)))
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn get(&self, entity: EntityType, business_number: &str) -> SyncResult<Option<Record>> {
        let filter = ListFilter::active()
            .with(super::Filter::eq(entity.key_field(), business_number));
        let params = filter.to_query_params();
        let rows = self
            .retry
            .execute(&format!("get {} {}", entity, business_number), || {
                self.fetch_rows(entity, &params)
            })
            .await?;

        if rows.len() > 1 {
            warn!(
                "{} active {} records share business number {}; using the first",
                rows.len(),
                entity,
                business_number
            );
        }
        rows.into_iter()
            .next()
            .map(|row| Record::from_json(entity, row))
            .transpose()
    }

    async fn upsert(&self, record: &Record) -> SyncResult<Record> {
        let label = format!("upsert {} {}", record.entity_type(), record.business_number());
        let rows = self.retry.execute(&label, || self.post_upsert(record)).await?;
        let row = rows.into_iter().next().ok_or_else(|| SyncError::Api {
            status: 200,
            message: format!("{} returned no representation", label),
        })?;
        Record::from_json(record.entity_type(), row)
    }

    async fn list(&self, entity: EntityType, filter: &ListFilter) -> SyncResult<Vec<Record>> {
        let mut base = filter.clone().limit(None).to_query_params();
        base.push(("order".to_string(), format!("{}.asc", entity.key_field())));

        let mut rows: Vec<Value> = Vec::new();
        loop {
            let wanted = match filter.limit {
                Some(limit) => limit.saturating_sub(rows.len()).min(self.page_size),
                None => self.page_size,
            };
            if wanted == 0 {
                break;
            }
            let mut params = base.clone();
            params.push(("limit".to_string(), wanted.to_string()));
            params.push(("offset".to_string(), rows.len().to_string()));

            let page = self
                .retry
                .execute(&format!("list {} from {}", entity, rows.len()), || {
                    self.fetch_rows(entity, &params)
                })
                .await?;
            // The gateway may return fewer rows than asked for; only an empty page ends the scan
            if page.is_empty() {
                break;
            }
            debug!("Fetched {} {} rows at offset {}", page.len(), entity, rows.len());
            rows.extend(page);
        }

        rows.into_iter()
            .map(|row| Record::from_json(entity, row))
            .collect()
    }

    fn describe(&self) -> String {
        format!("REST store at {}", self.base_url)
    }
}
