//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::AppState;
use super::types::{ErrorResponse, StateResponse, TickQuery};

/// Returns the run summary, the final queue and the latest tick record.
///
/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Response {
    Json(StateResponse {
        appliance_id: &state.appliance_id,
        summary: &state.summary,
        queue: &state.queue,
        latest_tick: state.ticks.last(),
    })
    .into_response()
}

/// Returns tick records, optionally filtered by tick range.
///
/// `GET /ticks` → 200 + `Vec<TickRecord>` JSON
/// `GET /ticks?from=N&to=M` → filtered range (inclusive)
/// `GET /ticks?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_ticks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TickQuery>,
) -> Response {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(usize::MAX);

    if from > to {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        )
            .into_response();
    }

    let ticks: Vec<_> = state
        .ticks
        .iter()
        .filter(|r| r.tick >= from && r.tick <= to)
        .collect();

    Json(ticks).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::ScenarioConfig;
    use crate::sim::{RunSummary, Runner};

    fn make_test_state() -> Arc<AppState> {
        let mut config = ScenarioConfig::baseline();
        config.simulation.ticks = 24;
        let mut runner = Runner::from_config(&config).unwrap();
        let ticks = runner.run();
        let summary = RunSummary::from_records(&ticks, runner.dt_hours());
        let end = ticks.last().map(|r| r.timestamp).unwrap();
        let queue = runner.handler_mut().inspect(end);
        Arc::new(AppState {
            appliance_id: config.simulation.appliance_id,
            summary,
            queue,
            ticks,
        })
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router(state);
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn state_returns_200() {
        let (status, json) = get_json(make_test_state(), "/state").await;

        assert_eq!(status, StatusCode::OK);
        assert!(json.get("summary").is_some());
        assert_eq!(json["summary"]["ticks"], 24);
        assert_eq!(json["queue"][0]["state"], "active");
        assert_eq!(json["queue"][0]["request"]["kind"], "soc");
        assert_eq!(json["latest_tick"]["tick"], 23);
    }

    #[tokio::test]
    async fn ticks_returns_all_records() {
        let (status, json) = get_json(make_test_state(), "/ticks").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(24));
    }

    #[tokio::test]
    async fn ticks_range_query() {
        let (status, json) = get_json(make_test_state(), "/ticks?from=5&to=10").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(6)); // ticks 5..=10
        assert_eq!(json[0]["tick"], 5);
        assert_eq!(json[5]["tick"], 10);
        assert_eq!(json[0]["timestamp"], "2026-01-05T18:05:00");
    }

    #[tokio::test]
    async fn ticks_invalid_range_returns_400() {
        let (status, json) = get_json(make_test_state(), "/ticks?from=10&to=5").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }
}
