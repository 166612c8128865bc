//! 포트폴리오 동기화 시스템의 에러 타입.
//!
//! 이 모듈은 시스템 전반에서 사용되는 최상위 에러 타입을 정의합니다.
//! 거래소/저장소 크레이트는 각자의 에러 타입을 가지며,
//! API 경계에서 이 타입으로 변환됩니다.

use thiserror::Error;

/// 핵심 서비스 에러.
#[derive(Debug, Error)]
pub enum FolioError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 인증 에러 (서명/패스프레이즈/권한)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 요청 한도 초과
    #[error("요청 한도 초과: {0}")]
    RateLimit(String),

    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 원격 응답 형식 에러 (데이터 무결성)
    #[error("프로토콜 에러: {0}")]
    Protocol(String),

    /// 외부 저장소 쓰기 에러
    #[error("저장소 쓰기 에러: {0}")]
    RemoteWrite(String),

    /// 데드라인 초과 (완료 {completed}건, 미처리 {pending}건)
    #[error("데드라인 초과: 완료 {completed}건, 미처리 {pending}건")]
    Timeout {
        /// 데드라인 이전에 완료된 항목 수
        completed: usize,
        /// 처리되지 못한 항목 수
        pending: usize,
    },

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 서비스 작업을 위한 Result 타입.
pub type FolioResult<T> = Result<T, FolioError>;

impl FolioError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FolioError::Network(_) | FolioError::RateLimit(_))
    }

    /// 치명적인 에러인지 확인합니다.
    ///
    /// 인증/프로토콜 에러는 재시도로 해결되지 않으며 호출자에게 그대로
    /// 전파됩니다.
    pub fn is_critical(&self) -> bool {
        matches!(self, FolioError::Auth(_) | FolioError::Protocol(_))
    }

    /// API 응답용 에러 코드 반환.
    pub fn code(&self) -> &'static str {
        match self {
            FolioError::Config(_) => "CONFIG_ERROR",
            FolioError::Auth(_) => "AUTH_ERROR",
            FolioError::RateLimit(_) => "RATE_LIMITED",
            FolioError::Network(_) => "NETWORK_ERROR",
            FolioError::Protocol(_) => "PROTOCOL_ERROR",
            FolioError::RemoteWrite(_) => "REMOTE_WRITE_ERROR",
            FolioError::Timeout { .. } => "TIMEOUT",
            FolioError::InvalidInput(_) => "INVALID_INPUT",
            FolioError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let network_err = FolioError::Network("timeout".to_string());
        assert!(network_err.is_retryable());

        let auth_err = FolioError::Auth("invalid key".to_string());
        assert!(!auth_err.is_retryable());
    }

    #[test]
    fn test_error_critical() {
        let auth_err = FolioError::Auth("invalid key".to_string());
        assert!(auth_err.is_critical());

        let write_err = FolioError::RemoteWrite("503".to_string());
        assert!(!write_err.is_critical());
    }

    #[test]
    fn test_error_code() {
        let err = FolioError::Timeout {
            completed: 3,
            pending: 2,
        };
        assert_eq!(err.code(), "TIMEOUT");
        assert!(err.to_string().contains("3"));
        assert!(err.to_string().contains("2"));
    }
}
