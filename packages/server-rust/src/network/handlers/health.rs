//! Health, liveness, and readiness endpoint handlers.
//!
//! These handlers expose server health information for orchestrators
//! (Kubernetes, load balancers) and operational monitoring.

use addsvc_core::messages::ServingStatus;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Returns detailed health information as JSON.
///
/// 200 while serving, 503 otherwise. The body carries the lifecycle state
/// either way so monitoring can tell "starting" from "draining".
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let status = state.health.overall();
    let code = if status == ServingStatus::Serving {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": status.as_str(),
            "state": state.shutdown.state().as_str(),
            "in_flight": state.shutdown.in_flight_count(),
            "uptime_secs": state.start_time.elapsed().as_secs(),
        })),
    )
}

/// Liveness probe: always 200 while the process is responsive.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: 200 while running, 503 during startup and shutdown.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.health.overall() == ServingStatus::Serving {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
