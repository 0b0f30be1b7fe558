//! Health and liveness endpoint handlers.
//!
//! Served outside the identity filter so orchestrators that are not
//! tailnet members can still check on the process.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::access::FILTER_NAME;

/// Returns basic health information as JSON.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "state": "ready",
        "filter": FILTER_NAME,
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "request_timeout_secs": state.config.request_timeout.as_secs(),
    }))
}

/// Liveness check -- always returns 200 OK.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}
