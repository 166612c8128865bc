//! 휴리스틱 리스크 분석.
//!
//! 집계된 스냅샷을 받아 사람이 읽을 수 있는 리밸런싱 제안을
//! 생성합니다. 규칙은 단순한 1차 휴리스틱입니다: 집중 리스크,
//! 더스트 정리, 스테이블코인 버퍼.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use folio_core::{DecimalExt, PortfolioSnapshot};

/// 스테이블코인으로 취급하는 심볼.
const STABLECOINS: &[&str] = &["USDT", "USDC", "DAI", "FDUSD", "TUSD"];

/// 스테이블코인 버퍼 하한 (%) - 미만이면 현금성 자산 확충 제안
const STABLE_BUFFER_LOW: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
/// 스테이블코인 버퍼 상한 (%) - 초과면 투입 검토 제안
const STABLE_BUFFER_HIGH: Decimal = Decimal::from_parts(40, 0, 0, false, 0);

/// 리스크 분석 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSummary {
    /// 한 줄 요약
    pub summary: String,
    /// 전체 대비 스테이블코인 비중 (%)
    pub stablecoin_percent: Decimal,
    /// 리밸런싱 제안 목록 (없으면 빈 배열)
    pub suggestions: Vec<String>,
}

/// 스냅샷에 대한 휴리스틱 리스크 분석을 수행합니다.
///
/// 제안 순서는 고정입니다: 집중 리스크, 더스트, 스테이블코인 버퍼.
pub fn analyze_risk(snapshot: &PortfolioSnapshot) -> RiskSummary {
    let mut suggestions = Vec::new();

    // 집중 리스크 - 집계 단계에서 플래그된 자산
    for allocation in snapshot.concentrated_assets() {
        suggestions.push(format!(
            "{} is {}% of portfolio; consider trimming.",
            allocation.symbol,
            allocation.percent.round_dp_half_up(1)
        ));
    }

    // 더스트 정리
    for allocation in snapshot.dust_assets() {
        suggestions.push(format!(
            "{} position is small (${}); consider consolidating.",
            allocation.symbol,
            allocation.value.round_dp_half_up(2)
        ));
    }

    // 스테이블코인 버퍼
    let stable_value: Decimal = snapshot
        .allocations
        .iter()
        .filter(|a| STABLECOINS.contains(&a.symbol.as_str()))
        .map(|a| a.value)
        .sum();
    let stablecoin_percent = if snapshot.total_value.is_zero() {
        Decimal::ZERO
    } else {
        (stable_value / snapshot.total_value * Decimal::ONE_HUNDRED).round_dp_half_up(2)
    };
    if !snapshot.total_value.is_zero() {
        if stablecoin_percent < STABLE_BUFFER_LOW {
            suggestions.push("Stablecoin buffer <5%; consider increasing dry powder.".to_string());
        } else if stablecoin_percent > STABLE_BUFFER_HIGH {
            suggestions.push(
                "High stablecoin share (>40%); consider deploying if unintentional.".to_string(),
            );
        }
    }

    let unpriced = snapshot.unpriced_assets().count();
    let summary = if unpriced > 0 {
        format!(
            "{} assets; total value ${} ({} without price data).",
            snapshot.allocations.len(),
            snapshot.total_value.round_dp_half_up(2),
            unpriced
        )
    } else {
        format!(
            "{} assets; total value ${}.",
            snapshot.allocations.len(),
            snapshot.total_value.round_dp_half_up(2)
        )
    };

    debug!(
        suggestions = suggestions.len(),
        stablecoin_percent = %stablecoin_percent,
        "Risk analysis complete"
    );

    RiskSummary {
        summary,
        stablecoin_percent,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use folio_core::AssetAllocation;
    use rust_decimal_macros::dec;

    fn allocation(symbol: &str, value: Decimal, percent: Decimal) -> AssetAllocation {
        AssetAllocation {
            symbol: symbol.to_string(),
            amount: Decimal::ONE,
            value,
            percent,
            is_dust: false,
            concentration: false,
            price_unknown: false,
        }
    }

    fn snapshot(allocations: Vec<AssetAllocation>) -> PortfolioSnapshot {
        PortfolioSnapshot {
            total_value: allocations.iter().map(|a| a.value).sum(),
            allocations,
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn test_concentration_suggestion() {
        let mut btc = allocation("BTC", dec!(8000), dec!(80));
        btc.concentration = true;
        let snap = snapshot(vec![btc, allocation("USDT", dec!(2000), dec!(20))]);

        let report = analyze_risk(&snap);

        assert!(report
            .suggestions
            .iter()
            .any(|s| s.contains("BTC") && s.contains("trimming")));
    }

    #[test]
    fn test_dust_suggestion() {
        let mut dust = allocation("SHIB", dec!(0.5), dec!(0.01));
        dust.is_dust = true;
        let snap = snapshot(vec![
            allocation("USDT", dec!(5000), dec!(99.99)),
            dust,
        ]);

        let report = analyze_risk(&snap);

        assert!(report
            .suggestions
            .iter()
            .any(|s| s.contains("SHIB") && s.contains("consolidating")));
    }

    #[test]
    fn test_low_stablecoin_buffer() {
        let snap = snapshot(vec![
            allocation("BTC", dec!(9800), dec!(98)),
            allocation("USDT", dec!(200), dec!(2)),
        ]);

        let report = analyze_risk(&snap);

        assert_eq!(report.stablecoin_percent, dec!(2));
        assert!(report
            .suggestions
            .iter()
            .any(|s| s.contains("Stablecoin buffer <5%")));
    }

    #[test]
    fn test_high_stablecoin_share() {
        let snap = snapshot(vec![
            allocation("BTC", dec!(4000), dec!(40)),
            allocation("USDC", dec!(6000), dec!(60)),
        ]);

        let report = analyze_risk(&snap);

        assert_eq!(report.stablecoin_percent, dec!(60));
        assert!(report
            .suggestions
            .iter()
            .any(|s| s.contains("High stablecoin share")));
    }

    #[test]
    fn test_balanced_portfolio_no_stable_suggestion() {
        let snap = snapshot(vec![
            allocation("BTC", dec!(8000), dec!(80)),
            allocation("USDT", dec!(2000), dec!(20)),
        ]);

        let report = analyze_risk(&snap);

        assert!(!report.suggestions.iter().any(|s| s.contains("Stablecoin")));
    }

    #[test]
    fn test_empty_snapshot() {
        let report = analyze_risk(&PortfolioSnapshot::empty());

        assert_eq!(report.stablecoin_percent, Decimal::ZERO);
        assert!(report.suggestions.is_empty());
    }
}
