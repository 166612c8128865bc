//! 포트폴리오 리포트 endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use folio_core::{PageRef, PortfolioSnapshot};
use folio_portfolio::{analyze_risk, RiskSummary};

use crate::error::{folio_error_response, provider_error_response};
use crate::state::AppState;

/// 리포트 생성 요청.
#[derive(Debug, Default, Deserialize)]
pub struct ReportRequest {
    /// 휴리스틱 리스크 분석 포함 여부
    #[serde(default = "default_true")]
    pub include_risk_analysis: bool,

    /// 리포트를 문서 저장소에도 동기화할지 여부
    #[serde(default)]
    pub generate_external_report: bool,
}

fn default_true() -> bool {
    true
}

/// 리포트 생성 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    /// 집계 시각
    pub as_of: DateTime<Utc>,
    /// 포트폴리오 스냅샷
    pub snapshot: PortfolioSnapshot,
    /// 리스크 분석 (요청 시)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_summary: Option<RiskSummary>,
    /// 외부 저장소에 기록된 페이지 참조 (요청 시)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_refs: Option<Vec<PageRef>>,
}

/// 포트폴리오 리포트 생성.
///
/// 잔고를 집계해 스냅샷을 만들고, 요청에 따라 리스크 분석과
/// 문서 저장소 동기화를 수행합니다.
///
/// POST /api/report
pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReportRequest>,
) -> Response {
    // 잔고 조회와 동기화가 같은 요청 예산을 공유한다
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

    let risk_summary = request
        .include_risk_analysis
        .then(|| analyze_risk(&snapshot));

    let external_refs = if request.generate_external_report {
        match state.synchronizer.synchronize(&snapshot, deadline).await {
            Ok(result) => Some(result.pages),
            Err(err) => return folio_error_response(&err).into_response(),
        }
    } else {
        None
    };

    info!(
        assets = snapshot.allocations.len(),
        total = %snapshot.total_value,
        with_risk = risk_summary.is_some(),
        with_external = external_refs.is_some(),
        "Report generated"
    );

    (
        StatusCode::OK,
        Json(ReportResponse {
            as_of: snapshot.computed_at,
            snapshot,
            risk_summary,
            external_refs,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::create_test_state;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/api/report", post(generate_report))
            .with_state(Arc::new(create_test_state()))
    }

    fn request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/report")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_report_includes_snapshot_and_risk() {
        let response = app().oneshot(request("{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: ReportResponse = body_json(response).await;

        // BTC 0.5 @ 60000 + ETH 2 @ 2000 = 34000
        assert_eq!(body.snapshot.total_value, dec!(34000));
        assert!(body.risk_summary.is_some());
        assert!(body.external_refs.is_none());
    }

    #[tokio::test]
    async fn test_report_without_risk_analysis() {
        let response = app()
            .oneshot(request(r#"{"include_risk_analysis":false}"#))
            .await
            .unwrap();

        let body: ReportResponse = body_json(response).await;
        assert!(body.risk_summary.is_none());
    }

    #[tokio::test]
    async fn test_external_report_returns_page_refs() {
        let response = app()
            .oneshot(request(r#"{"generate_external_report":true}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: ReportResponse = body_json(response).await;
        let refs = body.external_refs.expect("외부 참조 없음");
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().any(|p| p.id == "page-btc"));
    }
}
