//! API 라우트 정의.

pub mod balances;
pub mod health;
pub mod holdings;
pub mod report;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/balances", get(balances::get_balances))
        .route("/api/holdings/sync", post(holdings::sync_holdings))
        .route("/api/report", post(report::generate_report))
}
