//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use super::AppState;
use super::types::{ControlResponse, ErrorResponse, EventsQuery, MetricsResponse, ModeRequest};
use crate::runtime::RuntimeError;
use crate::sim::event::LogEvent;
use crate::sim::snapshot::FleetSnapshot;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn unavailable(e: RuntimeError) -> ApiError {
    error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
}

/// `GET /snapshot` → 200 + newest `FleetSnapshot` JSON
///
/// Before the first tick of a generation the vehicle and station lists are empty.
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<FleetSnapshot> {
    Json(FleetSnapshot::clone(&state.fleet.latest()))
}

/// `GET /events` → 200 + events, newest first
/// `GET /events?limit=N` → at most N events
pub async fn get_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<LogEvent>> {
    let snapshot = state.fleet.latest();
    let limit = query.limit.unwrap_or(usize::MAX);
    Json(snapshot.events.iter().take(limit).cloned().collect())
}

/// `GET /metrics` → 200 + `MetricsResponse` JSON
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    let s = state.fleet.latest();
    Json(MetricsResponse {
        generation: s.generation,
        tick: s.tick,
        clock: s.clock.clone(),
        mode: s.mode,
        metrics: s.metrics.clone(),
    })
}

/// `POST /control/start` → 200, or 503 if the stepper has shut down
pub async fn start(State(state): State<Arc<AppState>>) -> Result<Json<ControlResponse>, ApiError> {
    state.fleet.start().await.map_err(unavailable)?;
    Ok(Json(ControlResponse::accepted("start")))
}

/// `POST /control/stop` → 200, or 503 if the stepper has shut down
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<Json<ControlResponse>, ApiError> {
    state.fleet.stop().await.map_err(unavailable)?;
    Ok(Json(ControlResponse::accepted("stop")))
}

/// `POST /control/reset` → 200, or 503 if the stepper has shut down
pub async fn reset(State(state): State<Arc<AppState>>) -> Result<Json<ControlResponse>, ApiError> {
    state.fleet.reset().await.map_err(unavailable)?;
    Ok(Json(ControlResponse::accepted("reset")))
}

/// `POST /control/mode` with `{ "mode": "BASELINE" }` → 200
///
/// A malformed body or unknown mode → 400 + `ErrorResponse`.
pub async fn set_mode(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ModeRequest>, JsonRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    let Json(request) = body.map_err(|e| error(StatusCode::BAD_REQUEST, e.body_text()))?;
    state
        .fleet
        .set_mode(request.mode)
        .await
        .map_err(unavailable)?;
    Ok(Json(ControlResponse::accepted(format!(
        "mode {}",
        request.mode
    ))))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::ScenarioConfig;
    use crate::runtime::{TaskHandle, spawn_stepper};
    use crate::sim::{PolicyMode, Simulation};

    fn make_test_state(running: bool) -> (Arc<AppState>, TaskHandle) {
        let config = ScenarioConfig::island().build().unwrap();
        let mut sim = Simulation::new(Arc::new(config));
        sim.run(10);
        let (fleet, task) = spawn_stepper(sim, running, Duration::from_millis(100));
        (Arc::new(AppState { fleet }), task)
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn snapshot_returns_200() {
        let (state, _task) = make_test_state(false);
        let app = router(state);

        let req = Request::builder()
            .uri("/snapshot")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["tick"], 10);
        assert_eq!(json["vehicles"].as_array().map(Vec::len), Some(6));
        assert_eq!(json["stations"].as_array().map(Vec::len), Some(8));
        assert!(json["metrics"]["grid"].get("status").is_some());
    }

    #[tokio::test]
    async fn events_respect_limit() {
        let (state, _task) = make_test_state(false);
        let app = router(state);

        let req = Request::builder()
            .uri("/events?limit=1")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn metrics_include_ratios() {
        let (state, _task) = make_test_state(false);
        let app = router(state);

        let req = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let rate = json["metrics"]["platoon_rate"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&rate));
        assert!(json["metrics"].get("total_energy_actual").is_some());
    }

    #[tokio::test]
    async fn bad_mode_returns_400() {
        let (state, _task) = make_test_state(false);
        let app = router(state);

        let resp = app
            .oneshot(post("/control/mode", r#"{"mode":"TURBO"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn mode_switch_accepted() {
        let (state, _task) = make_test_state(false);
        let app = router(Arc::clone(&state));

        let resp = app
            .oneshot(post("/control/mode", r#"{"mode":"BASELINE"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["accepted"], true);

        let mut rx = state.fleet.subscribe();
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| s.mode == PolicyMode::Baseline),
        )
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test]
    async fn control_after_shutdown_returns_503() {
        let (state, task) = make_test_state(false);
        task.stop();
        task.join().await;
        let app = router(state);

        let resp = app.oneshot(post("/control/start", "")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "fleet stepper is not running");
    }
}
