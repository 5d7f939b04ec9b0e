//! HTTP router configuration

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::DispatcherConfig;
use crate::docs::openapi_spec;
use crate::error::request_id_middleware;
use crate::handlers::{health, health_check, list_dispatches, request_agent, stop_agent};
use crate::state::AppState;

/// Build the router with all endpoints and middleware
///
/// Layers, outermost first: CORS (when enabled), tracing, request id,
/// request timeout. The request id layer sits outside the timeout so timed
/// out requests still carry `X-Request-ID`.
pub fn router(state: AppState, config: &DispatcherConfig) -> Router {
    health::mark_started();

    let mut router = Router::new()
        .route("/api/livekit/request-agent", post(request_agent))
        .route("/api/livekit/stop-agent", delete(stop_agent))
        .route("/api/livekit/dispatches", get(list_dispatches))
        .route("/health", get(health_check));

    if config.enable_openapi {
        router = router.route("/api-docs/openapi.json", get(openapi_spec));
    }

    let mut router = router
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}
