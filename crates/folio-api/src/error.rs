//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트에서 일관된 에러 형식을 제공합니다. 업스트림
//! 에러는 역할에 따라 HTTP 상태로 매핑됩니다: 인증/프로토콜 오류는
//! 502, 한도 초과는 429, 데드라인 만료는 504, 항목 단위 부분 실패는
//! 200에 부분 결과로 남습니다.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use folio_core::{FolioError, ProviderError};

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "RATE_LIMITED",
///   "message": "Rate limit exceeded",
///   "timestamp": 1756600000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "AUTH_ERROR", "RATE_LIMITED", "TIMEOUT")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    pub timestamp: i64,
}

impl ApiErrorResponse {
    /// 기본 에러 생성.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// 잔고 제공자 에러를 HTTP 응답으로 매핑.
pub fn provider_error_response(err: &ProviderError) -> (StatusCode, Json<ApiErrorResponse>) {
    let (status, code) = match err {
        ProviderError::Authentication(_) => (StatusCode::BAD_GATEWAY, "AUTH_ERROR"),
        ProviderError::Protocol(_) => (StatusCode::BAD_GATEWAY, "PROTOCOL_ERROR"),
        ProviderError::Network(_) => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR"),
        ProviderError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        ProviderError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
    };
    (status, Json(ApiErrorResponse::new(code, err.to_string())))
}

/// 공통 에러를 HTTP 응답으로 매핑.
pub fn folio_error_response(err: &FolioError) -> (StatusCode, Json<ApiErrorResponse>) {
    match err {
        FolioError::Timeout { completed, pending } => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(ApiErrorResponse::with_details(
                "TIMEOUT",
                err.to_string(),
                json!({ "completed": completed, "pending": pending }),
            )),
        ),
        FolioError::InvalidInput(_) => (
            StatusCode::BAD_REQUEST,
            Json(ApiErrorResponse::new(err.code(), err.to_string())),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiErrorResponse::new(err.code(), err.to_string())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_status_mapping() {
        let cases = [
            (
                ProviderError::Authentication("bad sign".into()),
                StatusCode::BAD_GATEWAY,
                "AUTH_ERROR",
            ),
            (
                ProviderError::RateLimited("429".into()),
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
            ),
            (
                ProviderError::Timeout { attempts: 2 },
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
            ),
        ];

        for (err, expected_status, expected_code) in cases {
            let (status, Json(body)) = provider_error_response(&err);
            assert_eq!(status, expected_status);
            assert_eq!(body.code, expected_code);
        }
    }

    #[test]
    fn test_timeout_carries_progress_details() {
        let err = FolioError::Timeout {
            completed: 3,
            pending: 2,
        };
        let (status, Json(body)) = folio_error_response(&err);

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        let details = body.details.expect("details 없음");
        assert_eq!(details["completed"], 3);
        assert_eq!(details["pending"], 2);
    }
}
