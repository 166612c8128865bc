//! 정밀한 금융 계산을 위한 Decimal 유틸리티.

use rust_decimal::Decimal;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 지정된 소수점 자릿수로 반올림합니다 (사사오입).
    fn round_dp_half_up(&self, dp: u32) -> Decimal;
}

impl DecimalExt for Decimal {
    fn round_dp_half_up(&self, dp: u32) -> Decimal {
        self.round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
    }
}
