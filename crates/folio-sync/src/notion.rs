//! Notion 데이터베이스 클라이언트.
//!
//! 자산 심볼을 title 컬럼으로 갖는 데이터베이스에 대해
//! 조회(query)/생성(create)/갱신(update)을 수행합니다. 컬럼 구성:
//! Symbol(title), Amount/Value/Percent(number), LastSynced(date).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use folio_core::{AssetAllocation, DocumentStore, PageRef, StoreError, SyncRecord};

/// Notion API 버전 헤더 값.
const NOTION_VERSION: &str = "2022-06-28";

/// 기본 API 주소.
const DEFAULT_BASE_URL: &str = "https://api.notion.com";

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<NotionPage>,
}

#[derive(Debug, Deserialize)]
struct NotionPage {
    id: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    properties: Value,
}

// ============================================================================
// Notion 클라이언트
// ============================================================================

/// Notion 데이터베이스 저장소.
pub struct NotionStore {
    base_url: String,
    token: SecretString,
    database_id: String,
    client: Client,
}

impl std::fmt::Debug for NotionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionStore")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .field("database_id", &self.database_id)
            .finish()
    }
}

impl NotionStore {
    /// 새 Notion 저장소 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `StoreError::Network`를 반환합니다.
    pub fn new(
        token: impl Into<String>,
        database_id: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoreError::Network(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: SecretString::from(token.into()),
            database_id: database_id.into(),
            client,
        })
    }

    /// API 주소 지정 (테스트용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// 환경 변수에서 생성.
    ///
    /// `NOTION_TOKEN`, `NOTION_DATABASE_ID`가 모두 있어야 하며, 없으면
    /// `None`을 반환합니다.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("NOTION_TOKEN").ok()?;
        let database_id = std::env::var("NOTION_DATABASE_ID").ok()?;
        let mut store = Self::new(token, database_id, 20).ok()?;
        if let Ok(base_url) = std::env::var("NOTION_BASE_URL") {
            store = store.with_base_url(base_url);
        }
        Some(store)
    }

    /// 인증/버전 헤더가 적용된 요청 빌더.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(self.token.expose_secret())
            .header("Notion-Version", NOTION_VERSION)
    }

    /// JSON 요청 전송 및 응답 처리.
    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &Value,
    ) -> Result<T, StoreError> {
        debug!("{} {}", method, path);

        let response = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::map_status(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| StoreError::Protocol(e.to_string()))
    }

    /// HTTP 상태를 StoreError로 매핑.
    fn map_status(status: reqwest::StatusCode, body: &str) -> StoreError {
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                StoreError::Unauthorized(body.to_string())
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => StoreError::RateLimited,
            _ => StoreError::RemoteWrite {
                status: status.as_u16(),
                message: body.to_string(),
            },
        }
    }

    /// 레코드 한 건의 컬럼 값 구성.
    fn properties(allocation: &AssetAllocation, synced_at: DateTime<Utc>) -> Value {
        json!({
            "Symbol": { "title": [{ "text": { "content": allocation.symbol } }] },
            "Amount": { "number": allocation.amount.to_f64().unwrap_or_default() },
            "Value": { "number": allocation.value.to_f64().unwrap_or_default() },
            "Percent": { "number": allocation.percent.to_f64().unwrap_or_default() },
            "LastSynced": { "date": { "start": synced_at.to_rfc3339() } },
        })
    }

    /// 페이지 속성에서 number 컬럼 추출.
    fn extract_number(properties: &Value, column: &str) -> Decimal {
        properties
            .pointer(&format!("/{}/number", column))
            .and_then(Value::as_f64)
            .and_then(Decimal::from_f64_retain)
            .unwrap_or_default()
    }

    /// 페이지 속성에서 date 컬럼 추출.
    fn extract_date(properties: &Value, column: &str) -> DateTime<Utc> {
        properties
            .pointer(&format!("/{}/date/start", column))
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[async_trait]
impl DocumentStore for NotionStore {
    /// 심볼 title 필터로 기존 페이지 조회.
    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<SyncRecord>, StoreError> {
        let body = json!({
            "filter": { "property": "Symbol", "title": { "equals": symbol } },
            "page_size": 1,
        });
        let path = format!("/v1/databases/{}/query", self.database_id);

        let response: QueryResponse = self
            .send_json(reqwest::Method::POST, &path, &body)
            .await?;

        Ok(response.results.into_iter().next().map(|page| SyncRecord {
            last_value: Self::extract_number(&page.properties, "Value"),
            last_synced: Self::extract_date(&page.properties, "LastSynced"),
            page_id: Some(page.id),
            symbol: symbol.to_string(),
        }))
    }

    async fn create(
        &self,
        allocation: &AssetAllocation,
        synced_at: DateTime<Utc>,
    ) -> Result<PageRef, StoreError> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": Self::properties(allocation, synced_at),
        });

        let page: NotionPage = self
            .send_json(reqwest::Method::POST, "/v1/pages", &body)
            .await?;

        debug!(symbol = %allocation.symbol, page_id = %page.id, "Created page");
        Ok(PageRef {
            id: page.id,
            url: page.url,
        })
    }

    async fn update(
        &self,
        page_id: &str,
        allocation: &AssetAllocation,
        synced_at: DateTime<Utc>,
    ) -> Result<PageRef, StoreError> {
        let body = json!({ "properties": Self::properties(allocation, synced_at) });
        let path = format!("/v1/pages/{}", page_id);

        let page: NotionPage = self
            .send_json(reqwest::Method::PATCH, &path, &body)
            .await?;

        debug!(symbol = %allocation.symbol, page_id = %page.id, "Updated page");
        Ok(PageRef {
            id: page.id,
            url: page.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_store(base_url: &str) -> NotionStore {
        NotionStore::new("secret-token", "db-123", 5)
            .expect("테스트용 저장소 생성 실패")
            .with_base_url(base_url)
    }

    fn allocation(symbol: &str) -> AssetAllocation {
        AssetAllocation {
            symbol: symbol.to_string(),
            amount: dec!(0.5),
            value: dec!(30000),
            percent: dec!(88.22),
            is_dust: false,
            concentration: true,
            price_unknown: false,
        }
    }

    #[tokio::test]
    async fn test_find_by_symbol_returns_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/databases/db-123/query")
            .match_header("authorization", "Bearer secret-token")
            .match_header("notion-version", NOTION_VERSION)
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "filter": { "property": "Symbol", "title": { "equals": "BTC" } }
            })))
            .with_status(200)
            .with_body(
                r#"{"results":[{
                    "id":"page-1",
                    "url":"https://notion.so/page-1",
                    "properties":{
                        "Value":{"number":29000.0},
                        "LastSynced":{"date":{"start":"2026-08-30T12:00:00+00:00"}}
                    }
                }]}"#,
            )
            .create_async()
            .await;

        let store = test_store(&server.url());
        let record = store
            .find_by_symbol("BTC")
            .await
            .expect("조회 실패")
            .expect("레코드 없음");

        mock.assert_async().await;
        assert_eq!(record.page_id.as_deref(), Some("page-1"));
        assert_eq!(record.symbol, "BTC");
        assert_eq!(record.last_value, dec!(29000));
    }

    #[tokio::test]
    async fn test_find_by_symbol_absent_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/databases/db-123/query")
            .with_status(200)
            .with_body(r#"{"results":[]}"#)
            .create_async()
            .await;

        let store = test_store(&server.url());
        let record = store.find_by_symbol("XYZ").await.expect("조회 실패");

        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_create_posts_parent_and_properties() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/pages")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "parent": { "database_id": "db-123" },
                "properties": {
                    "Symbol": { "title": [{ "text": { "content": "BTC" } }] },
                    "Value": { "number": 30000.0 }
                }
            })))
            .with_status(200)
            .with_body(r#"{"id":"page-9","url":"https://notion.so/page-9","properties":{}}"#)
            .create_async()
            .await;

        let store = test_store(&server.url());
        let page = store
            .create(&allocation("BTC"), Utc::now())
            .await
            .expect("생성 실패");

        mock.assert_async().await;
        assert_eq!(page.id, "page-9");
        assert_eq!(page.url, "https://notion.so/page-9");
    }

    #[tokio::test]
    async fn test_update_patches_existing_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/v1/pages/page-9")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "properties": { "Value": { "number": 30000.0 } }
            })))
            .with_status(200)
            .with_body(r#"{"id":"page-9","url":"https://notion.so/page-9","properties":{}}"#)
            .create_async()
            .await;

        let store = test_store(&server.url());
        let page = store
            .update("page-9", &allocation("BTC"), Utc::now())
            .await
            .expect("갱신 실패");

        mock.assert_async().await;
        assert_eq!(page.id, "page-9");
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/pages")
            .with_status(401)
            .with_body(r#"{"message":"API token is invalid."}"#)
            .create_async()
            .await;

        let store = test_store(&server.url());
        let result = store.create(&allocation("BTC"), Utc::now()).await;

        assert!(matches!(result, Err(StoreError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_remote_write() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PATCH", "/v1/pages/page-9")
            .with_status(503)
            .with_body("Service Unavailable")
            .create_async()
            .await;

        let store = test_store(&server.url());
        let result = store.update("page-9", &allocation("BTC"), Utc::now()).await;

        assert!(matches!(
            result,
            Err(StoreError::RemoteWrite { status: 503, .. })
        ));
    }

    #[test]
    fn test_debug_masks_token() {
        let store = NotionStore::new("super-secret", "db-123", 5).expect("생성 실패");
        let formatted = format!("{:?}", store);

        assert!(!formatted.contains("super-secret"));
        assert!(formatted.contains("***"));
    }
}
