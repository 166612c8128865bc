//! 거래소 에러 타입.

use folio_core::ProviderError;
use thiserror::Error;

/// 거래소 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 인증/권한 에러 (서명, 패스프레이즈, API 키 권한)
    #[error("Unauthorized: {0} (check server clock sync and API key IP whitelist)")]
    Unauthorized(String),

    /// 요청 한도 초과
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 타임스탬프 동기화 에러 (서버 허용 범위 밖의 KC-API-TIMESTAMP)
    #[error("Timestamp error: {0}")]
    TimestampError(String),

    /// 파싱/역직렬화 에러 (예상치 못한 응답 형식)
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// 거래소 API 에러 코드
    #[error("API error {code}: {message}")]
    ApiError {
        /// 거래소 응답 코드
        code: String,
        /// 에러 메시지
        message: String,
    },

    /// 데드라인 초과
    #[error("Deadline exceeded after {attempts} attempt(s)")]
    Timeout {
        /// 데드라인까지 수행된 시도 횟수
        attempts: u32,
    },
}

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인합니다.
    ///
    /// 타임스탬프 에러는 재시도마다 새 타임스탬프로 재서명되므로
    /// 일시적 에러로 취급합니다. 인증/프로토콜 에러는 재시도로 해결되지
    /// 않습니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::NetworkError(_)
                | ExchangeError::RateLimited
                | ExchangeError::TimestampError(_)
        )
    }
}

impl From<ExchangeError> for ProviderError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::NetworkError(msg) => ProviderError::Network(msg),
            ExchangeError::Unauthorized(msg) => ProviderError::Authentication(msg),
            ExchangeError::RateLimited => {
                ProviderError::RateLimited("exchange rate limit".to_string())
            }
            ExchangeError::TimestampError(msg) => ProviderError::Authentication(msg),
            ExchangeError::ProtocolError(msg) => ProviderError::Protocol(msg),
            ExchangeError::ApiError { code, message } => {
                ProviderError::Protocol(format!("{}: {}", code, message))
            }
            ExchangeError::Timeout { attempts } => ProviderError::Timeout { attempts },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ExchangeError::NetworkError("timeout".to_string()).is_retryable());
        assert!(ExchangeError::RateLimited.is_retryable());
        assert!(ExchangeError::TimestampError("skew".to_string()).is_retryable());

        assert!(!ExchangeError::Unauthorized("bad sign".to_string()).is_retryable());
        assert!(!ExchangeError::ProtocolError("bad json".to_string()).is_retryable());
    }
}
