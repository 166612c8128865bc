//! 포트폴리오 집계기.
//!
//! 정규화된 잔고 레코드를 받아 평가액/비중/플래그가 계산된 스냅샷을
//! 만듭니다. 시세 조회가 실패한 자산은 평가액 0으로 포함되고
//! `price_unknown`으로 표시됩니다 - 유동성 없는 자산 하나가 전체
//! 리포트를 막지 않도록 하는 의도된 설계입니다.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use folio_core::{
    AssetAllocation, BalanceRecord, DecimalExt, PortfolioSettings, PortfolioSnapshot, PriceSource,
};

/// 집계 설정.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// 더스트 판정 기준 (평가액 미만이면 더스트)
    pub dust_threshold: Decimal,
    /// 집중 리스크 판정 기준 (비중 초과 시 플래그)
    pub concentration_threshold: Decimal,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            dust_threshold: Decimal::new(10, 0),
            concentration_threshold: Decimal::new(40, 0),
        }
    }
}

impl From<&PortfolioSettings> for AggregatorConfig {
    fn from(settings: &PortfolioSettings) -> Self {
        Self {
            dust_threshold: settings.dust_threshold,
            concentration_threshold: settings.concentration_threshold,
        }
    }
}

/// 포트폴리오 집계기.
///
/// 입력과 시세 조회 결과에 대한 결정적 순수 함수이며 부수 효과가
/// 없습니다.
pub struct Aggregator {
    config: AggregatorConfig,
}

impl Aggregator {
    /// 새 집계기 생성.
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// 잔고 레코드를 포트폴리오 스냅샷으로 집계합니다.
    ///
    /// - 여러 계좌에 걸친 동일 심볼은 수량을 합산합니다.
    /// - 총 잔고가 0인 자산은 제외합니다.
    /// - 전체 평가액이 0이면 모든 비중은 0으로 보고합니다 (0 나눗셈 방지).
    /// - 결과는 평가액 내림차순으로 정렬됩니다.
    pub async fn aggregate(
        &self,
        records: &[BalanceRecord],
        prices: &dyn PriceSource,
    ) -> PortfolioSnapshot {
        // 계좌 유형에 걸쳐 심볼별 수량 합산 (BTreeMap: 결정적 순회 순서)
        let mut amounts: BTreeMap<String, Decimal> = BTreeMap::new();
        for record in records {
            *amounts.entry(record.symbol.clone()).or_default() += record.total();
        }
        amounts.retain(|_, amount| !amount.is_zero());

        // 자산별 평가액 계산 - 시세 실패는 해당 자산만 격리
        let mut valued: Vec<(String, Decimal, Decimal, bool)> = Vec::with_capacity(amounts.len());
        for (symbol, amount) in amounts {
            match prices.quote(&symbol).await {
                Ok(price) => {
                    let value = amount * price;
                    valued.push((symbol, amount, value, false));
                }
                Err(err) => {
                    warn!(%symbol, error = %err, "Price unavailable, degrading to zero value");
                    valued.push((symbol, amount, Decimal::ZERO, true));
                }
            }
        }

        let total_value: Decimal = valued.iter().map(|(_, _, value, _)| *value).sum();

        let mut allocations: Vec<AssetAllocation> = valued
            .into_iter()
            .map(|(symbol, amount, value, price_unknown)| {
                let percent = if total_value.is_zero() {
                    Decimal::ZERO
                } else {
                    (value / total_value * Decimal::ONE_HUNDRED).round_dp_half_up(4)
                };

                AssetAllocation {
                    is_dust: !price_unknown && value < self.config.dust_threshold,
                    concentration: percent > self.config.concentration_threshold,
                    symbol,
                    amount,
                    value,
                    percent,
                    price_unknown,
                }
            })
            .collect();

        allocations.sort_by(|a, b| b.value.cmp(&a.value));

        debug!(
            assets = allocations.len(),
            total = %total_value,
            "Aggregated portfolio snapshot"
        );

        PortfolioSnapshot {
            total_value,
            allocations,
            computed_at: Utc::now(),
        }
    }
}
