//! # Folio Core
//!
//! 포트폴리오 동기화 서비스의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 잔고 및 포트폴리오 스냅샷 타입
//! - 동기화 레코드 및 결과 타입
//! - 외부 협력자(거래소, 가격 조회, 문서 저장소) trait 정의
//! - 설정 관리
//! - 로깅 인프라
//! - 감사(audit) 기록

pub mod audit;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use audit::*;
pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
