//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! Arc로 래핑되어 요청 간에 안전하게 공유됩니다. 협력자(거래소,
//! 시세, 문서 저장소)는 trait 객체로 보유하므로 테스트에서는 가짜
//! 구현으로 교체할 수 있습니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use folio_core::{AccountType, AuditRecorder, BalanceProvider, PriceSource};
use folio_portfolio::Aggregator;
use folio_sync::RecordSynchronizer;

/// 애플리케이션 공유 상태.
///
/// Axum의 State extractor를 통해 핸들러에 주입됩니다.
#[derive(Clone)]
pub struct AppState {
    /// 거래소 잔고 제공자
    pub balances: Arc<dyn BalanceProvider>,

    /// 자산 시세 소스
    pub prices: Arc<dyn PriceSource>,

    /// 포트폴리오 집계기
    pub aggregator: Arc<Aggregator>,

    /// 문서 저장소 동기화기
    pub synchronizer: Arc<RecordSynchronizer>,

    /// 감사 기록기
    pub audit: AuditRecorder,

    /// 잔고 조회 기본 계좌 유형
    pub default_account: AccountType,

    /// 동기화 배치 데드라인 (None이면 무제한)
    pub sync_deadline: Option<Duration>,

    /// API 버전
    pub version: String,

    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 새 애플리케이션 상태 생성.
    pub fn new(
        balances: Arc<dyn BalanceProvider>,
        prices: Arc<dyn PriceSource>,
        aggregator: Aggregator,
        synchronizer: RecordSynchronizer,
    ) -> Self {
        Self {
            balances,
            prices,
            aggregator: Arc::new(aggregator),
            synchronizer: Arc::new(synchronizer),
            audit: AuditRecorder::disabled(),
            default_account: AccountType::Trade,
            sync_deadline: Some(Duration::from_secs(30)),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// 감사 기록기 지정.
    pub fn with_audit(mut self, audit: AuditRecorder) -> Self {
        self.audit = audit;
        self
    }

    /// 기본 계좌 유형 지정.
    pub fn with_default_account(mut self, account: AccountType) -> Self {
        self.default_account = account;
        self
    }

    /// 동기화 데드라인 지정.
    pub fn with_sync_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.sync_deadline = deadline;
        self
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// 지금부터 계산한 동기화 데드라인.
    pub fn deadline(&self) -> Option<Instant> {
        self.sync_deadline.map(|budget| Instant::now() + budget)
    }
}
