//! 거래소 잔고 타입.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 거래소 계좌 유형.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// 입출금 계좌
    Main,
    /// 거래 계좌 (포트폴리오 추적 기본값)
    #[default]
    Trade,
    /// 모든 계좌
    All,
}

impl AccountType {
    /// 쿼리 파라미터 값 반환. `All`은 필터 없음을 의미합니다.
    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            AccountType::Main => Some("main"),
            AccountType::Trade => Some("trade"),
            AccountType::All => None,
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" => Ok(Self::Main),
            "trade" => Ok(Self::Trade),
            "all" => Ok(Self::All),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountType::Main => write!(f, "main"),
            AccountType::Trade => write!(f, "trade"),
            AccountType::All => write!(f, "all"),
        }
    }
}

/// 자산의 정규화된 잔고 레코드.
///
/// 거래소 응답의 숫자 문자열은 통화 반올림 오차를 피하기 위해
/// `Decimal`로 변환되며, 심볼은 대문자로 정규화됩니다.
/// 생성 이후 불변입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// 자산 심볼 (예: "BTC", "USDT")
    pub symbol: String,
    /// 소속 계좌 유형
    pub account_type: AccountType,
    /// 사용 가능한 잔고
    pub free: Decimal,
    /// 주문에 묶인 잔고
    pub locked: Decimal,
}

impl BalanceRecord {
    /// 총 잔고 반환 (사용 가능 + 묶인 잔고).
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }

    /// 총 잔고가 0인지 확인합니다.
    pub fn is_zero(&self) -> bool {
        self.total().is_zero()
    }
}
