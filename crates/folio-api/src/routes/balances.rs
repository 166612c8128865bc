//! 원시 잔고 조회 endpoint.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use folio_core::{AccountType, BalanceRecord};

use crate::error::{provider_error_response, ApiErrorResponse};
use crate::state::AppState;

/// 잔고 조회 쿼리 파라미터.
#[derive(Debug, Deserialize)]
pub struct BalancesQuery {
    /// 계좌 유형 ("main" | "trade" | "all", 기본값은 서버 설정)
    pub account_type: Option<String>,
}

/// 잔고 조회 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalancesResponse {
    /// 조회 시각
    pub as_of: DateTime<Utc>,
    /// 조회한 계좌 유형
    pub account_type: String,
    /// 정규화된 잔고 레코드
    pub records: Vec<BalanceRecord>,
}

/// 거래소 원시 잔고 조회.
///
/// GET /api/balances?account_type=trade
pub async fn get_balances(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BalancesQuery>,
) -> Response {
    let account = match &query.account_type {
        Some(raw) => match raw.parse::<AccountType>() {
            Ok(account) => account,
            Err(message) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiErrorResponse::new("INVALID_INPUT", message)),
                )
                    .into_response();
            }
        },
        None => state.default_account,
    };

    match state
        .balances
        .fetch_balances(account, state.deadline())
        .await
    {
        Ok(records) => {
            debug!(count = records.len(), %account, "Balances served");
            (
                StatusCode::OK,
                Json(BalancesResponse {
                    as_of: Utc::now(),
                    account_type: account.to_string(),
                    records,
                }),
            )
                .into_response()
        }
        Err(err) => provider_error_response(&err).into_response(),
    }
}
