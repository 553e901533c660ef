//! Google Sheets v4 values client

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::ServiceAccountAuth;
use super::{CellValue, SheetSource, SheetTarget, SpreadsheetRow, rows_from_grid};
use crate::api::resilience::{ConcurrencyLimiter, ResilienceConfig, RetryPolicy, error_for_status};
use crate::error::{SyncError, SyncResult};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Read-only Sheets client authenticated with a service account
pub struct SheetsClient {
    http: reqwest::Client,
    auth: Arc<ServiceAccountAuth>,
    retry: RetryPolicy,
    limiter: ConcurrencyLimiter,
    base_url: String,
}

impl SheetsClient {
    pub fn new(auth: Arc<ServiceAccountAuth>, http: reqwest::Client, resilience: &ResilienceConfig) -> Self {
        Self {
            http,
            auth,
            retry: RetryPolicy::new(resilience.retry.clone()),
            limiter: ConcurrencyLimiter::new(resilience.concurrency.clone()),
            base_url: SHEETS_API_BASE.to_string(),
        }
    }

    /// Point the client at another endpoint (emulators, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn values_url(&self, target: &SheetTarget) -> String {
        format!(
            "{}/{}/values/{}?valueRenderOption=UNFORMATTED_VALUE&dateTimeRenderOption=SERIAL_NUMBER&majorDimension=ROWS",
            self.base_url,
            urlencoding::encode(&target.spreadsheet_id),
            urlencoding::encode(&target.a1_range())
        )
    }

    async fn fetch_grid(&self, target: &SheetTarget) -> SyncResult<Vec<Vec<CellValue>>> {
        let _permit = self.limiter.acquire().await?;
        let token = self.auth.access_token().await?;
        let url = self.values_url(target);
        debug!("GET {}", url);

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 {
                self.auth.invalidate();
            }
            // An unknown sheet name comes back as 400 "Unable to parse range"
            if status.as_u16() == 400 && body.contains("Unable to parse range") {
                return Err(SyncError::not_found(format!(
                    "range '{}' in spreadsheet {}",
                    target.a1_range(),
                    target.spreadsheet_id
                )));
            }
            return Err(error_for_status(
                status.as_u16(),
                format!("Sheets API {} for '{}': {}", status, target.a1_range(), body),
            ));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| SyncError::Transport(format!("invalid Sheets response: {}", e)))?;

        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(CellValue::from_json).collect())
            .collect())
    }
}

#[async_trait]
impl SheetSource for SheetsClient {
    async fn read_rows(&self, target: &SheetTarget) -> SyncResult<Vec<SpreadsheetRow>> {
        let label = format!("read {}", target.a1_range());
        let grid = self
            .retry
            .execute(&label, || self.fetch_grid(target))
            .await?;
        let rows = rows_from_grid(grid);
        info!(
            "Read {} rows from '{}' ({})",
            rows.len(),
            target.sheet_name,
            target.spreadsheet_id
        );
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("Google Sheets as {}", self.auth.client_email())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sheets::ServiceAccountKey;
    use serde_json::json;
    use wiremock::matchers::{header, method, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn auth() -> Arc<ServiceAccountAuth> {
        let key = ServiceAccountKey {
            client_email: "sync@example.com".into(),
            private_key: String::new(),
            token_uri: "https://oauth2.googleapis.com/token".into(),
        };
        Arc::new(ServiceAccountAuth::new(key, reqwest::Client::new()))
    }

    fn client() -> SheetsClient {
        SheetsClient::new(auth(), reqwest::Client::new(), &ResilienceConfig::disabled())
    }

    /// Client against a mock server, holding a valid cached token
    fn served(server: &MockServer) -> (SheetsClient, Arc<ServiceAccountAuth>) {
        let auth = auth();
        auth.set_token("cached-token");
        let client = SheetsClient::new(auth.clone(), reqwest::Client::new(), &ResilienceConfig::disabled())
            .with_base_url(format!("{}/v4/spreadsheets", server.uri()));
        (client, auth)
    }

    async fn respond_with(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path_regex("^/v4/spreadsheets/sheet-id/values/"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn target() -> SheetTarget {
        SheetTarget::new("sheet-id", "Sellers", "A1:C")
    }

    #[test]
    fn test_values_url_encodes_sheet_name() {
        let url = client().values_url(&SheetTarget::new("sheet-id", "売主 リスト", "A1:Z"));
        assert!(url.starts_with("https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/"));
        assert!(url.contains("%E5%A3%B2%E4%B8%BB%20%E3%83%AA%E3%82%B9%E3%83%88%21A1%3AZ"));
        assert!(url.contains("dateTimeRenderOption=SERIAL_NUMBER"));
    }

    #[test]
    fn test_value_range_without_values() {
        let range: ValueRange = serde_json::from_str(r#"{"range":"x!A1:B2","majorDimension":"ROWS"}"#).unwrap();
        assert!(range.values.is_empty());
    }

    #[test]
    fn test_base_url_override() {
        let client = client().with_base_url("http://localhost:8085/v4/spreadsheets/");
        let url = client.values_url(&SheetTarget::new("id", "s", "A1"));
        assert!(url.starts_with("http://localhost:8085/v4/spreadsheets/id/values/s%21A1?"));
    }

    #[tokio::test]
    async fn test_read_rows_from_values_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/v4/spreadsheets/sheet-id/values/"))
            .and(header("authorization", "Bearer cached-token"))
            .and(query_param("valueRenderOption", "UNFORMATTED_VALUE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "Sellers!A1:C3",
                "majorDimension": "ROWS",
                "values": [["売主番号", "名前"], ["AA1", "山田"], [], ["AA2"]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = served(&server);
        let rows = client.read_rows(&target()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[1].row_number, 4);
        assert_eq!(rows[1].get("名前"), Some(&CellValue::Empty));
    }

    #[tokio::test]
    async fn test_unauthorized_drops_cached_token() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(401).set_body_string("expired")).await;

        let (client, auth) = served(&server);
        let err = client.read_rows(&target()).await.unwrap_err();
        assert!(matches!(err, SyncError::Authentication(_)));
        assert!(!auth.has_token());
    }

    #[tokio::test]
    async fn test_forbidden_is_authentication_error() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(403).set_body_string("not shared")).await;

        let (client, auth) = served(&server);
        let err = client.read_rows(&target()).await.unwrap_err();
        assert!(matches!(err, SyncError::Authentication(_)));
        assert!(auth.has_token());
    }

    #[tokio::test]
    async fn test_missing_spreadsheet_is_not_found() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(404).set_body_string("Requested entity was not found.")).await;

        let (client, _) = served(&server);
        let err = client.read_rows(&target()).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_sheet_name_is_not_found() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(400).set_body_string(r#"{"error":{"message":"Unable to parse range: Sellers!A1:C"}}"#),
        )
        .await;

        let (client, _) = served(&server);
        let err = client.read_rows(&target()).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_other_bad_request_is_api_error() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(400).set_body_string("bad request")).await;

        let (client, _) = served(&server);
        let err = client.read_rows(&target()).await.unwrap_err();
        assert!(matches!(err, SyncError::Api { status: 400, .. }));
    }
}
