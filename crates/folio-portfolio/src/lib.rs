//! 포트폴리오 집계 및 리스크 분석.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 잔고 레코드를 포트폴리오 스냅샷으로 집계 (평가액, 비중, 더스트,
//!   집중 리스크)
//! - 휴리스틱 리스크 요약 (집중/더스트/스테이블코인 비중 제안)

pub mod aggregator;
pub mod risk;

pub use aggregator::{Aggregator, AggregatorConfig};
pub use risk::{analyze_risk, RiskSummary};
