//! 보유 자산 동기화 endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::info;

use crate::error::{folio_error_response, provider_error_response};
use crate::state::AppState;

/// 현재 잔고를 집계해 문서 저장소로 동기화.
///
/// 항목 단위 실패는 배치를 중단시키지 않으며, 부분 실패가 있어도
/// 200에 `failed` 목록이 담긴 결과를 반환합니다. 데드라인 만료는
/// 504로 진행 상황(완료/미처리 수)과 함께 보고됩니다.
///
/// POST /api/holdings/sync
pub async fn sync_holdings(State(state): State<Arc<AppState>>) -> Response {
    // 잔고 조회 재시도와 항목별 동기화가 같은 예산을 공유한다
    let deadline = state.deadline();

    let records = match state
        .balances
        .fetch_balances(state.default_account, deadline)
        .await
    {
        Ok(records) => records,
        Err(err) => return provider_error_response(&err).into_response(),
    };

    let snapshot = state.aggregator.aggregate(&records, &*state.prices).await;

    match state.synchronizer.synchronize(&snapshot, deadline).await {
        Ok(result) => {
            info!(
                created = result.created,
                updated = result.updated,
                unchanged = result.unchanged,
                failed = result.failed.len(),
                "Holdings synced"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(err) => folio_error_response(&err).into_response(),
    }
}
