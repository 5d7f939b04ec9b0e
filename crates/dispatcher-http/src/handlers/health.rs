//! Health handler

use axum::{extract::State, response::Json};
use std::sync::OnceLock;
use std::time::Instant;

use crate::state::AppState;

// Track service start time for uptime calculation
static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Start the uptime clock; called when the router is built
pub(crate) fn mark_started() {
    START_TIME.get_or_init(Instant::now);
}

fn get_uptime_seconds() -> u64 {
    START_TIME.get_or_init(Instant::now).elapsed().as_secs()
}

/// GET /health - Liveness and registry configuration status
///
/// Always 200. Registry reachability is not probed here.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = serde_json::Value)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "dispatcher-http",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": get_uptime_seconds(),
        "registry_configured": state.registry_configured(),
        "registry_backend": state.registry_backend(),
    }))
}
