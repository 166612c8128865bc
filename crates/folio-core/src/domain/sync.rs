//! 외부 저장소 동기화 타입.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 외부 저장소 페이지 참조.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRef {
    /// 페이지 식별자
    pub id: String,
    /// 페이지 URL
    pub url: String,
}

/// 자산 심볼을 자연 키로 하는 동기화 레코드.
///
/// 첫 upsert 성공 시 생성되고, 이후 값이 달라질 때만 갱신됩니다.
/// 이 시스템은 레코드를 삭제하지 않습니다 (스냅샷에 없는 자산이어도
/// 기존 레코드는 유지).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// 외부 페이지 식별자 (첫 쓰기 전에는 None)
    pub page_id: Option<String>,
    /// 자산 심볼 (자연 키)
    pub symbol: String,
    /// 마지막으로 동기화된 평가액
    pub last_value: Decimal,
    /// 마지막 동기화 시각
    pub last_synced: DateTime<Utc>,
}

/// 항목별 동기화 실패 내역.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncFailure {
    /// 실패한 자산 심볼
    pub symbol: String,
    /// 에러 종류 (예: "REMOTE_WRITE_ERROR")
    pub error_kind: String,
    /// 에러 메시지
    pub message: String,
}

/// 동기화 배치 결과.
///
/// 항목별 호출은 독립적이며, 한 자산의 실패는 나머지 자산의 동기화를
/// 중단시키지 않습니다 (원자성 없는 최선 노력 배치).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    /// 새로 생성된 레코드 수
    pub created: usize,
    /// 갱신된 레코드 수
    pub updated: usize,
    /// 변경 없어 건너뛴 레코드 수
    pub unchanged: usize,
    /// 항목별 실패 목록
    pub failed: Vec<SyncFailure>,
    /// 생성/갱신된 페이지 참조
    #[serde(default)]
    pub pages: Vec<PageRef>,
}

impl SyncResult {
    /// 실제로 쓰기가 발생한 항목 수.
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }

    /// 처리가 끝난 항목 수 (실패 포함).
    pub fn completed(&self) -> usize {
        self.created + self.updated + self.unchanged + self.failed.len()
    }

    /// 실패 없이 완료되었는지 확인합니다.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
