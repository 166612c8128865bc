//! 포트폴리오 스냅샷 타입.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 단일 자산의 배분 내역.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAllocation {
    /// 자산 심볼
    pub symbol: String,
    /// 보유 수량
    pub amount: Decimal,
    /// 평가액 (시세 미확인 시 0)
    pub value: Decimal,
    /// 전체 대비 비중 (%, 소수점 4자리)
    pub percent: Decimal,
    /// 더스트 포지션 여부 (평가액 < 더스트 기준)
    pub is_dust: bool,
    /// 집중 리스크 여부 (비중 > 집중 기준)
    pub concentration: bool,
    /// 시세를 조회하지 못한 자산 (평가액 0으로 포함)
    pub price_unknown: bool,
}

/// 집계된 포트폴리오 스냅샷.
///
/// 불변 조건: 전체 평가액이 0보다 크면 모든 자산의 `percent` 합이
/// 반올림 허용 오차(±0.01) 내에서 100%, 0이면 모두 0%입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// 전체 평가액
    pub total_value: Decimal,
    /// 평가액 내림차순으로 정렬된 자산 배분
    pub allocations: Vec<AssetAllocation>,
    /// 집계 시각
    pub computed_at: DateTime<Utc>,
}

impl PortfolioSnapshot {
    /// 빈 스냅샷 생성.
    pub fn empty() -> Self {
        Self {
            total_value: Decimal::ZERO,
            allocations: Vec::new(),
            computed_at: Utc::now(),
        }
    }

    /// 더스트로 판정된 자산 목록.
    pub fn dust_assets(&self) -> impl Iterator<Item = &AssetAllocation> {
        self.allocations.iter().filter(|a| a.is_dust)
    }

    /// 집중 리스크로 판정된 자산 목록.
    pub fn concentrated_assets(&self) -> impl Iterator<Item = &AssetAllocation> {
        self.allocations.iter().filter(|a| a.concentration)
    }

    /// 시세를 조회하지 못한 자산 목록.
    pub fn unpriced_assets(&self) -> impl Iterator<Item = &AssetAllocation> {
        self.allocations.iter().filter(|a| a.price_unknown)
    }
}
