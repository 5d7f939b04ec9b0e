//! OpenAPI document for the trigger endpoints

use axum::response::Json;
use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers::{
    DispatchesResponse, StartAgentRequest, StartAgentResponse, StopAgentRequest,
    StopAgentResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::triggers::request_agent,
        crate::handlers::triggers::stop_agent,
        crate::handlers::triggers::list_dispatches
    ),
    components(schemas(
        StartAgentRequest,
        StartAgentResponse,
        StopAgentRequest,
        StopAgentResponse,
        DispatchesResponse,
        ErrorResponse
    )),
    tags(
        (name = "triggers", description = "Agent dispatch triggers"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "Dispatcher API",
        description = "Request and release agent workers for conference rooms"
    )
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json - OpenAPI specification endpoint
pub async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
