//! 포트폴리오 브릿지 API 서버 라이브러리.
//!
//! Axum 기반 HTTP 서버의 상태, 라우트, 에러 응답을 제공합니다.

pub mod error;
pub mod routes;
pub mod state;
