//! KuCoin 거래소 클라이언트.
//!
//! 서명된 REST 요청으로 계좌 잔고를 조회하고, 공개 시세 엔드포인트로
//! 자산의 USD 환산 가격을 조회합니다. 일시적 에러는 지수 백오프로
//! 재시도하며, 모든 시도와 최종 결과를 감사 기록기에 보고합니다.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::error::{ExchangeError, ExchangeResult};
use crate::retry::{with_retry, RetryConfig};
use crate::signer::{KucoinCredential, KucoinSigner};
use folio_core::{
    AccountType, AuditOutcome, AuditRecorder, BalanceProvider, BalanceRecord, PriceError,
    PriceSource, ProviderError,
};

/// KuCoin 성공 응답 코드.
const CODE_SUCCESS: &str = "200000";

/// 계좌 잔고 endpoint.
const ACCOUNTS_PATH: &str = "/api/v1/accounts";

/// 공개 시세 endpoint (인증 불필요).
const PRICES_PATH: &str = "/api/v1/prices";

// ============================================================================
// API 응답 타입
// ============================================================================

/// KuCoin 공통 응답 envelope.
#[derive(Debug, Deserialize)]
struct KucoinEnvelope<T> {
    code: String,
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct KucoinAccount {
    currency: String,
    #[serde(rename = "type")]
    account_type: String,
    available: String,
    holds: String,
}

// ============================================================================
// KuCoin 클라이언트
// ============================================================================

/// KuCoin 거래소 클라이언트.
pub struct KucoinClient {
    base_url: String,
    signer: KucoinSigner,
    client: Client,
    retry: RetryConfig,
    audit: AuditRecorder,
}

impl KucoinClient {
    /// 새 KuCoin 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를
    /// 반환합니다.
    pub fn new(credential: KucoinCredential, timeout_secs: u64) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExchangeError::NetworkError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            base_url: credential.base_url.clone(),
            signer: KucoinSigner::new(credential),
            client,
            retry: RetryConfig::default(),
            audit: AuditRecorder::disabled(),
        })
    }

    /// 재시도 설정 지정.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// 감사 기록기 지정.
    pub fn with_audit(mut self, audit: AuditRecorder) -> Self {
        self.audit = audit;
        self
    }

    /// 환경 변수에서 생성.
    ///
    /// 환경 변수가 없거나 클라이언트 생성에 실패하면 `None`을 반환합니다.
    pub fn from_env() -> Option<Self> {
        KucoinCredential::from_env().and_then(|credential| Self::new(credential, 20).ok())
    }

    /// 계좌 유형별 잔고 조회.
    ///
    /// 일시적 에러(네트워크, 한도 초과, 타임스탬프 스큐)는 재시도하며,
    /// 재시도마다 새 타임스탬프로 재서명합니다. 인증/프로토콜 에러는
    /// 즉시 반환됩니다. `deadline`은 모든 재시도를 합친 상한입니다.
    pub async fn get_accounts(
        &self,
        account_type: AccountType,
        deadline: Option<Instant>,
    ) -> ExchangeResult<Vec<BalanceRecord>> {
        let path = match account_type.as_query() {
            Some(t) => format!("{}?type={}", ACCOUNTS_PATH, t),
            None => ACCOUNTS_PATH.to_string(),
        };

        let started = std::time::Instant::now();
        let result = with_retry(&self.retry, deadline, |attempt| {
            self.attempt_accounts(path.clone(), account_type, attempt)
        })
        .await;

        let outcome = match &result {
            Ok(records) => {
                debug!(count = records.len(), %account_type, "Fetched account balances");
                AuditOutcome::Success
            }
            Err(err) => {
                error!(%account_type, error = %err, "Balance fetch failed");
                AuditOutcome::failure(error_kind(err), err.to_string())
            }
        };
        self.audit.record(
            "exchange.get_balances",
            json!({ "account_type": account_type.to_string() }),
            outcome,
            started.elapsed(),
        );

        result
    }

    /// 한 번의 서명된 잔고 조회 시도.
    ///
    /// 응답 본문의 숫자 변환까지 포함해야 최종 감사 기록이
    /// 프로토콜 에러를 반영합니다.
    async fn attempt_accounts(
        &self,
        path: String,
        account_type: AccountType,
        attempt: u32,
    ) -> ExchangeResult<Vec<BalanceRecord>> {
        let started = std::time::Instant::now();
        let result = match self.signed_get::<Vec<KucoinAccount>>(&path).await {
            Ok(accounts) => accounts
                .into_iter()
                .filter_map(|account| match account.account_type.parse::<AccountType>() {
                    Ok(parsed) => Some(Self::to_balance_record(account, parsed)),
                    Err(_) => {
                        // 추적 대상이 아닌 계좌 유형(margin 등)은 건너뜀
                        debug!(account_type = %account.account_type, "Skipping unsupported account");
                        None
                    }
                })
                .collect(),
            Err(err) => Err(err),
        };

        let outcome = match &result {
            Ok(_) => AuditOutcome::Success,
            Err(err) => AuditOutcome::failure(error_kind(err), err.to_string()),
        };
        self.audit.record(
            "exchange.get_balances.attempt",
            json!({ "account_type": account_type.to_string(), "attempt": attempt }),
            outcome,
            started.elapsed(),
        );

        result
    }

    /// 서명된 GET 요청 (인증 필요).
    async fn signed_get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> ExchangeResult<T> {
        let headers = self.signer.sign("GET", path, "");
        let url = format!("{}{}", self.base_url, path);

        debug!("GET (signed) {}", path);

        let request = headers.apply(self.client.get(&url));
        let response = request
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        self.handle_response(response).await
    }

    /// 공개 GET 요청 (인증 불필요).
    async fn public_get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> ExchangeResult<T> {
        let url = format!("{}{}", self.base_url, path);

        debug!("GET {}", path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        self.handle_response(response).await
    }

    /// API 응답 처리.
    ///
    /// KuCoin은 HTTP 상태와 별개로 `{code, msg, data}` envelope을
    /// 사용하므로 envelope 코드를 우선 해석합니다.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        match serde_json::from_str::<KucoinEnvelope<T>>(&body) {
            Ok(envelope) if envelope.code == CODE_SUCCESS => envelope.data.ok_or_else(|| {
                ExchangeError::ProtocolError("Missing data in success response".to_string())
            }),
            Ok(envelope) => Err(Self::map_error_code(
                &envelope.code,
                envelope.msg.as_deref().unwrap_or(""),
            )),
            Err(e) if status.is_success() => {
                error!("Failed to parse response: {} - Body: {}", e, body);
                Err(ExchangeError::ProtocolError(e.to_string()))
            }
            Err(_) => Err(Self::map_http_status(status, &body)),
        }
    }

    /// KuCoin 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(code: &str, msg: &str) -> ExchangeError {
        match code {
            // KC-API-TIMESTAMP가 서버 허용 범위 밖 - 재서명으로 복구 가능
            "400002" => ExchangeError::TimestampError(msg.to_string()),
            // 키/서명/패스프레이즈/권한/IP 화이트리스트 오류
            "400001" | "400003" | "400004" | "400005" | "400006" | "400007" => {
                ExchangeError::Unauthorized(msg.to_string())
            }
            "429000" => ExchangeError::RateLimited,
            _ => ExchangeError::ApiError {
                code: code.to_string(),
                message: msg.to_string(),
            },
        }
    }

    /// envelope이 아닌 응답의 HTTP 상태 매핑.
    fn map_http_status(status: reqwest::StatusCode, body: &str) -> ExchangeError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            ExchangeError::RateLimited
        } else if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            ExchangeError::Unauthorized(body.to_string())
        } else if status.is_server_error() {
            ExchangeError::NetworkError(format!("Server error {}: {}", status, body))
        } else {
            ExchangeError::ApiError {
                code: status.as_u16().to_string(),
                message: body.to_string(),
            }
        }
    }

    /// 원시 계좌 항목을 정규화된 잔고 레코드로 변환.
    fn to_balance_record(
        account: KucoinAccount,
        account_type: AccountType,
    ) -> ExchangeResult<BalanceRecord> {
        Ok(BalanceRecord {
            symbol: account.currency.to_uppercase(),
            account_type,
            free: Self::parse_decimal("available", &account.available)?,
            locked: Self::parse_decimal("holds", &account.holds)?,
        })
    }

    /// 숫자 문자열을 Decimal로 변환.
    ///
    /// 통화 반올림 오차를 피하기 위해 부동소수점을 사용하지 않으며,
    /// 변환 실패는 데이터 무결성 문제로 간주합니다.
    fn parse_decimal(field: &str, s: &str) -> ExchangeResult<Decimal> {
        s.parse().map_err(|_| {
            ExchangeError::ProtocolError(format!("Invalid decimal in field '{}': {}", field, s))
        })
    }
}

#[async_trait]
impl BalanceProvider for KucoinClient {
    fn name(&self) -> &str {
        "kucoin"
    }

    async fn fetch_balances(
        &self,
        account_type: AccountType,
        deadline: Option<Instant>,
    ) -> Result<Vec<BalanceRecord>, ProviderError> {
        self.get_accounts(account_type, deadline)
            .await
            .map_err(ProviderError::from)
    }
}

#[async_trait]
impl PriceSource for KucoinClient {
    /// 공개 시세 endpoint에서 자산의 USD 환산 가격 조회.
    async fn quote(&self, symbol: &str) -> Result<Decimal, PriceError> {
        let symbol = symbol.to_uppercase();
        let path = format!("{}?currencies={}", PRICES_PATH, symbol);

        let prices: HashMap<String, String> =
            self.public_get(&path).await.map_err(|e| match e {
                ExchangeError::NetworkError(msg) => PriceError::Network(msg),
                ExchangeError::ProtocolError(msg) => PriceError::Protocol(msg),
                other => PriceError::Network(other.to_string()),
            })?;

        let raw = prices
            .get(&symbol)
            .ok_or_else(|| PriceError::Unavailable(symbol.clone()))?;

        raw.parse().map_err(|_| {
            PriceError::Protocol(format!("Invalid price for {}: {}", symbol, raw))
        })
    }
}

/// 감사 기록용 에러 종류 문자열.
fn error_kind(err: &ExchangeError) -> &'static str {
    match err {
        ExchangeError::NetworkError(_) => "NETWORK_ERROR",
        ExchangeError::Unauthorized(_) => "AUTH_ERROR",
        ExchangeError::RateLimited => "RATE_LIMITED",
        ExchangeError::TimestampError(_) => "TIMESTAMP_ERROR",
        ExchangeError::ProtocolError(_) => "PROTOCOL_ERROR",
        ExchangeError::ApiError { .. } => "API_ERROR",
        ExchangeError::Timeout { .. } => "TIMEOUT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn test_client(base_url: &str) -> KucoinClient {
        let credential = KucoinCredential::new("key", "secret", "passphrase", base_url);
        KucoinClient::new(credential, 5)
            .expect("테스트용 클라이언트 생성 실패")
            .with_retry_config(RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                jitter: false,
            })
    }

    #[tokio::test]
    async fn test_get_accounts_parses_balances() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/accounts")
            .match_query(mockito::Matcher::UrlEncoded(
                "type".to_string(),
                "trade".to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{"code":"200000","data":[
                    {"id":"1","currency":"btc","type":"trade","balance":"0.5","available":"0.4","holds":"0.1"},
                    {"id":"2","currency":"USDT","type":"trade","balance":"100","available":"100","holds":"0"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let records = client
            .get_accounts(AccountType::Trade, None)
            .await
            .expect("잔고 조회 실패");

        mock.assert_async().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol, "BTC");
        assert_eq!(records[0].free, dec!(0.4));
        assert_eq!(records[0].locked, dec!(0.1));
        assert_eq!(records[0].total(), dec!(0.5));
        assert_eq!(records[1].symbol, "USDT");
    }

    #[tokio::test]
    async fn test_auth_error_not_retried() {
        let mut server = mockito::Server::new_async().await;
        // 재시도가 없었음을 expect(1)로 검증
        let mock = server
            .mock("GET", "/api/v1/accounts")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code":"400004","msg":"Invalid KC-API-PASSPHRASE"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client.get_accounts(AccountType::Trade, None).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ExchangeError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/accounts")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .with_body("Too Many Requests")
            .expect(3)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client.get_accounts(AccountType::Trade, None).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ExchangeError::RateLimited)));
    }

    #[tokio::test]
    async fn test_malformed_number_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/accounts")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"code":"200000","data":[
                    {"id":"1","currency":"BTC","type":"trade","balance":"x","available":"not-a-number","holds":"0"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client.get_accounts(AccountType::Trade, None).await;

        assert!(matches!(result, Err(ExchangeError::ProtocolError(_))));
    }

    #[tokio::test]
    async fn test_quote_returns_decimal_price() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/prices")
            .match_query(mockito::Matcher::UrlEncoded(
                "currencies".to_string(),
                "BTC".to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"code":"200000","data":{"BTC":"60000.5"}}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let price = client.quote("btc").await.expect("시세 조회 실패");

        assert_eq!(price, dec!(60000.5));
    }

    #[tokio::test]
    async fn test_quote_missing_symbol_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/prices")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code":"200000","data":{}}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client.quote("OBSCURE").await;

        assert!(matches!(result, Err(PriceError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_audit_records_attempts_and_outcome() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/accounts")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code":"200000","data":[]}"#)
            .create_async()
            .await;

        let (audit, mut rx) = AuditRecorder::channel();
        let client = test_client(&server.url()).with_audit(audit);

        client
            .get_accounts(AccountType::Trade, None)
            .await
            .expect("잔고 조회 실패");

        let attempt = rx.recv().await.expect("시도 감사 항목 없음");
        assert_eq!(attempt.operation, "exchange.get_balances.attempt");
        assert_eq!(attempt.outcome, AuditOutcome::Success);

        let outcome = rx.recv().await.expect("최종 감사 항목 없음");
        assert_eq!(outcome.operation, "exchange.get_balances");
        assert_eq!(outcome.outcome, AuditOutcome::Success);
    }

    /// 응답 숫자 변환 실패는 에러로 반환될 뿐 아니라 감사 기록에도
    /// 실패로 남아야 합니다.
    #[tokio::test]
    async fn test_protocol_error_audited_as_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/accounts")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"code":"200000","data":[
                    {"id":"1","currency":"BTC","type":"trade","balance":"0.5","available":"not-a-number","holds":"0"}
                ]}"#,
            )
            .create_async()
            .await;

        let (audit, mut rx) = AuditRecorder::channel();
        let client = test_client(&server.url()).with_audit(audit);

        let result = client.get_accounts(AccountType::Trade, None).await;
        assert!(matches!(result, Err(ExchangeError::ProtocolError(_))));

        let attempt = rx.recv().await.expect("시도 감사 항목 없음");
        assert_eq!(attempt.operation, "exchange.get_balances.attempt");
        assert!(matches!(attempt.outcome, AuditOutcome::Failure { .. }));

        let outcome = rx.recv().await.expect("최종 감사 항목 없음");
        assert_eq!(outcome.operation, "exchange.get_balances");
        assert!(matches!(outcome.outcome, AuditOutcome::Failure { .. }));
    }
}
