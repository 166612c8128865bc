//! 외부 협력자 추상화.
//!
//! 거래소, 가격 조회, 문서 저장소에 대한 구현 중립적인 인터페이스를
//! 제공합니다. 구현체는 각 크레이트(folio-exchange, folio-sync)에
//! 있으며, 이 trait들 덕분에 상위 계층을 가짜 구현으로 격리 테스트할 수
//! 있습니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::time::Instant;

use super::{AccountType, AssetAllocation, BalanceRecord, PageRef, SyncRecord};

// =============================================================================
// 에러 타입
// =============================================================================

/// 잔고 제공자 에러.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 네트워크 에러 (연결/타임아웃) - 재시도 대상
    #[error("Network error: {0}")]
    Network(String),

    /// 인증 실패 (서명/패스프레이즈/권한) - 재시도 불가
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// 요청 한도 초과 - 재시도 대상
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// 예상치 못한 응답 형식 - 재시도 불가
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 데드라인 초과
    #[error("Deadline exceeded after {attempts} attempt(s)")]
    Timeout {
        /// 데드라인까지 수행된 시도 횟수
        attempts: u32,
    },
}

/// 가격 조회 에러.
#[derive(Debug, Error)]
pub enum PriceError {
    /// 해당 심볼의 시세 없음 - 자산 단위로 격리되어 집계를 중단시키지 않음
    #[error("No quote available for {0}")]
    Unavailable(String),

    /// 네트워크 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 예상치 못한 응답 형식
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// 문서 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 네트워크 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 인증 실패 (토큰 무효)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 요청 한도 초과
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 원격 쓰기 실패
    #[error("Remote write failed ({status}): {message}")]
    RemoteWrite {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 메시지
        message: String,
    },

    /// 예상치 못한 응답 형식
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    /// API 응답용 에러 종류 문자열.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Network(_) => "NETWORK_ERROR",
            StoreError::Unauthorized(_) => "AUTH_ERROR",
            StoreError::RateLimited => "RATE_LIMITED",
            StoreError::RemoteWrite { .. } => "REMOTE_WRITE_ERROR",
            StoreError::Protocol(_) => "PROTOCOL_ERROR",
        }
    }
}

// =============================================================================
// 협력자 trait
// =============================================================================

/// 거래소 잔고 제공자 trait.
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// 제공자 이름 (로깅/감사용).
    fn name(&self) -> &str;

    /// 계좌 유형별 정규화된 잔고 조회.
    ///
    /// `deadline`은 내부 재시도를 모두 합친 상한입니다. 호출자가 요청
    /// 단위 예산을 잡으면 동일한 데드라인이 이후 동기화 단계까지
    /// 이어집니다.
    ///
    /// # Errors
    ///
    /// - `ProviderError::Authentication`: 서명/패스프레이즈/권한 오류
    /// - `ProviderError::RateLimited`: 재시도 소진 후 한도 초과
    /// - `ProviderError::Network`: 재시도 소진 후 연결 실패
    /// - `ProviderError::Protocol`: 응답 형식 오류
    /// - `ProviderError::Timeout`: 데드라인 내에 응답을 받지 못함
    async fn fetch_balances(
        &self,
        account_type: AccountType,
        deadline: Option<Instant>,
    ) -> Result<Vec<BalanceRecord>, ProviderError>;
}

/// 가격 조회 trait.
///
/// 자산 1단위당 기준 통화(USD) 가치를 반환합니다.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// 심볼의 단위당 시세 조회.
    async fn quote(&self, symbol: &str) -> Result<Decimal, PriceError>;
}

/// 문서 저장소 trait.
///
/// 자산 심볼을 자연 키로 하는 upsert 계약을 제공합니다.
/// find → create/update 시퀀스는 원자적이지 않으며, 동시 쓰기 시
/// 마지막 쓰기가 이기는(lost-update) 제약이 있습니다.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 심볼로 기존 레코드 조회.
    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<SyncRecord>, StoreError>;

    /// 새 레코드 생성.
    async fn create(
        &self,
        allocation: &AssetAllocation,
        synced_at: DateTime<Utc>,
    ) -> Result<PageRef, StoreError>;

    /// 기존 레코드 갱신.
    async fn update(
        &self,
        page_id: &str,
        allocation: &AssetAllocation,
        synced_at: DateTime<Utc>,
    ) -> Result<PageRef, StoreError>;
}
