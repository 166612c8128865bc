//! 레코드 동기화기.
//!
//! 포트폴리오 스냅샷을 자산 심볼을 자연 키로 하는 문서 저장소 레코드로
//! upsert합니다. 항목별 호출은 독립적이며(원자성 없음), 값이 허용 오차
//! 이내로 같은 자산은 쓰기를 건너뜁니다. 변경 없는 스냅샷을 다시
//! 동기화하면 쓰기가 발생하지 않습니다.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use folio_core::{
    AuditOutcome, AuditRecorder, DocumentStore, FolioError, PortfolioSnapshot, SyncFailure,
    SyncResult,
};

/// 동기화 설정.
#[derive(Debug, Clone)]
pub struct SynchronizerConfig {
    /// 값 비교 허용 오차 - 이 이하의 차이는 변경으로 보지 않음
    pub epsilon: Decimal,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            // 1e-8: 거래소 잔고 정밀도(소수점 8자리)와 일치
            epsilon: Decimal::new(1, 8),
        }
    }
}

/// 레코드 동기화기.
///
/// 단일 쓰기 주체를 가정합니다. 동시에 여러 동기화기가 같은
/// 데이터베이스에 쓰면 find→create 사이의 경합으로 중복 레코드가
/// 생길 수 있습니다.
pub struct RecordSynchronizer {
    store: Arc<dyn DocumentStore>,
    config: SynchronizerConfig,
    audit: AuditRecorder,
}

impl RecordSynchronizer {
    /// 새 동기화기 생성.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            config: SynchronizerConfig::default(),
            audit: AuditRecorder::disabled(),
        }
    }

    /// 동기화 설정 지정.
    pub fn with_config(mut self, config: SynchronizerConfig) -> Self {
        self.config = config;
        self
    }

    /// 감사 기록기 지정.
    pub fn with_audit(mut self, audit: AuditRecorder) -> Self {
        self.audit = audit;
        self
    }

    /// 스냅샷을 저장소로 동기화합니다.
    ///
    /// 자산별로 기존 레코드를 조회해 없으면 생성, 값이 허용 오차보다
    /// 크게 달라졌으면 갱신, 아니면 건너뜁니다. 한 자산의 실패는
    /// 기록만 하고 나머지 자산을 계속 처리합니다. 레코드는 삭제하지
    /// 않습니다 (스냅샷에 없는 자산의 기존 레코드는 유지).
    ///
    /// # Errors
    ///
    /// 데드라인이 배치 도중 만료되면 `FolioError::Timeout`을 반환합니다.
    /// 이미 적용된 쓰기는 되돌리지 않습니다.
    pub async fn synchronize(
        &self,
        snapshot: &PortfolioSnapshot,
        deadline: Option<Instant>,
    ) -> Result<SyncResult, FolioError> {
        let started = std::time::Instant::now();
        let total = snapshot.allocations.len();
        let mut result = SyncResult::default();

        for allocation in &snapshot.allocations {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    let completed = result.completed();
                    warn!(
                        completed,
                        pending = total - completed,
                        "Sync deadline expired mid-batch"
                    );
                    self.audit.record(
                        "sync.synchronize",
                        json!({ "assets": total }),
                        AuditOutcome::failure(
                            "TIMEOUT",
                            format!("{} of {} items synced before deadline", completed, total),
                        ),
                        started.elapsed(),
                    );
                    return Err(FolioError::Timeout {
                        completed,
                        pending: total - completed,
                    });
                }
            }

            match self.store.find_by_symbol(&allocation.symbol).await {
                Ok(None) => match self.store.create(allocation, snapshot.computed_at).await {
                    Ok(page) => {
                        debug!(symbol = %allocation.symbol, page_id = %page.id, "Record created");
                        result.created += 1;
                        result.pages.push(page);
                    }
                    Err(err) => Self::record_failure(&mut result, &allocation.symbol, &err),
                },
                Ok(Some(record)) => {
                    if (allocation.value - record.last_value).abs() <= self.config.epsilon {
                        debug!(symbol = %allocation.symbol, "Record unchanged, skipping write");
                        result.unchanged += 1;
                        continue;
                    }
                    // 값이 달라진 기존 레코드 - page_id가 없으면 생성으로 처리
                    let write = match &record.page_id {
                        Some(page_id) => {
                            self.store
                                .update(page_id, allocation, snapshot.computed_at)
                                .await
                        }
                        None => self.store.create(allocation, snapshot.computed_at).await,
                    };
                    match write {
                        Ok(page) => {
                            debug!(symbol = %allocation.symbol, page_id = %page.id, "Record updated");
                            if record.page_id.is_some() {
                                result.updated += 1;
                            } else {
                                result.created += 1;
                            }
                            result.pages.push(page);
                        }
                        Err(err) => Self::record_failure(&mut result, &allocation.symbol, &err),
                    }
                }
                Err(err) => Self::record_failure(&mut result, &allocation.symbol, &err),
            }
        }

        info!(
            created = result.created,
            updated = result.updated,
            unchanged = result.unchanged,
            failed = result.failed.len(),
            "Sync batch complete"
        );
        let outcome = if result.is_clean() {
            AuditOutcome::Success
        } else {
            AuditOutcome::failure(
                "PARTIAL_FAILURE",
                format!("{} of {} items failed", result.failed.len(), total),
            )
        };
        self.audit.record(
            "sync.synchronize",
            json!({ "assets": total }),
            outcome,
            started.elapsed(),
        );

        Ok(result)
    }

    /// 항목 실패를 결과에 기록하고 배치를 계속 진행합니다.
    fn record_failure(result: &mut SyncResult, symbol: &str, err: &folio_core::StoreError) {
        warn!(%symbol, error = %err, "Record sync failed, continuing batch");
        result.failed.push(SyncFailure {
            symbol: symbol.to_string(),
            error_kind: err.kind().to_string(),
            message: err.to_string(),
        });
    }
}
