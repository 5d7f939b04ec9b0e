//! Start and stop triggers
//!
//! Both validate their input before touching the registry: a missing room is
//! a 400 even when the registry is not configured.

use axum::{
    body::Bytes,
    extract::{Extension, Query, State, rejection::QueryRejection},
    response::Json,
};
use dispatcher_core::{AgentName, DispatchMetadata, RoomName};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::types::{
    DispatchesResponse, RoomQuery, StartAgentRequest, StartAgentResponse, StopAgentRequest,
    StopAgentResponse,
};
use crate::error::{ErrorResponse, RequestId, RequestIdExtension, TriggerError, TriggerResult};
use crate::state::AppState;

pub(crate) fn parse_room(value: Option<&str>, request_id: &RequestId) -> TriggerResult<RoomName> {
    let value =
        value.ok_or_else(|| TriggerError::missing_required_field("room", request_id.clone()))?;
    RoomName::parse(value)
        .map_err(|e| TriggerError::from_validation("room", &e, request_id.clone()))
}

/// Decode a JSON body regardless of its content type; a blank body is empty input
pub(crate) fn decode_body<T: DeserializeOwned + Default>(
    body: &Bytes,
    request_id: &RequestId,
) -> TriggerResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| TriggerError::invalid_json(e.to_string(), request_id.clone()))
}

/// Explicit agent name, or the configured default when absent
pub(crate) fn parse_agent_name(
    value: Option<&str>,
    state: &AppState,
    request_id: &RequestId,
) -> TriggerResult<AgentName> {
    match value {
        Some(value) => AgentName::parse(value)
            .map_err(|e| TriggerError::from_validation("agentName", &e, request_id.clone())),
        None => Ok(state.default_agent_name().clone()),
    }
}

/// POST /api/livekit/request-agent - Ensure an agent is dispatched to a room
#[utoipa::path(
    post,
    path = "/api/livekit/request-agent",
    request_body = StartAgentRequest,
    responses(
        (status = 200, description = "Dispatch created or already present", body = StartAgentResponse),
        (status = 400, description = "Missing or invalid room", body = ErrorResponse),
        (status = 500, description = "Registry not configured or unavailable", body = ErrorResponse)
    ),
    tag = "triggers"
)]
pub async fn request_agent(
    State(state): State<AppState>,
    Extension(RequestIdExtension(request_id)): Extension<RequestIdExtension>,
    body: Bytes,
) -> TriggerResult<Json<StartAgentResponse>> {
    let request: StartAgentRequest = decode_body(&body, &request_id)?;

    let room = parse_room(request.room.as_deref(), &request_id)?;
    let agent_name = parse_agent_name(request.agent_name.as_deref(), &state, &request_id)?;
    let metadata = request
        .metadata
        .map(DispatchMetadata::new)
        .unwrap_or_else(|| state.default_metadata().clone());

    let reconciler = state.reconciler(&request_id)?;
    let outcome = reconciler
        .ensure_dispatch(&room, &agent_name, &metadata)
        .await
        .map_err(|e| TriggerError::from_reconcile(e, request_id.clone()))?;

    info!(
        request_id = %request_id,
        room = %room,
        agent_name = %agent_name,
        outcome = outcome.as_str(),
        dispatch_id = %outcome.dispatch().id,
        "Agent requested"
    );

    Ok(Json(StartAgentResponse::from(&outcome)))
}

/// DELETE /api/livekit/stop-agent - Remove an agent's dispatch from a room
///
/// Room and agent come from the query string (`room-name`, `agent-name`) or,
/// failing that, from an optional JSON body. The body is not consulted when
/// the query already names the room.
#[utoipa::path(
    delete,
    path = "/api/livekit/stop-agent",
    params(RoomQuery),
    request_body(content = StopAgentRequest, description = "Optional alternative to the query string"),
    responses(
        (status = 200, description = "Dispatch deleted", body = StopAgentResponse),
        (status = 400, description = "Missing or invalid room or agent name", body = ErrorResponse),
        (status = 404, description = "No dispatch for this room and agent", body = ErrorResponse),
        (status = 500, description = "Registry not configured or unavailable", body = ErrorResponse)
    ),
    tag = "triggers"
)]
pub async fn stop_agent(
    State(state): State<AppState>,
    Extension(RequestIdExtension(request_id)): Extension<RequestIdExtension>,
    query: Result<Query<RoomQuery>, QueryRejection>,
    body: Bytes,
) -> TriggerResult<Json<StopAgentResponse>> {
    let Query(query) = query
        .map_err(|e| TriggerError::invalid_input("query", e.body_text(), request_id.clone()))?;

    let body: StopAgentRequest = if query.room_name.is_some() {
        if !body.iter().all(u8::is_ascii_whitespace) {
            debug!(request_id = %request_id, "Ignoring stop body; query names the room");
        }
        StopAgentRequest::default()
    } else {
        decode_body(&body, &request_id)?
    };

    let room = parse_room(query.room_name.or(body.room).as_deref(), &request_id)?;
    let agent_name = parse_agent_name(
        query.agent_name.or(body.agent_name).as_deref(),
        &state,
        &request_id,
    )?;

    let reconciler = state.reconciler(&request_id)?;
    let deleted = reconciler
        .remove_dispatch(&room, &agent_name)
        .await
        .map_err(|e| TriggerError::from_reconcile(e, request_id.clone()))?;

    info!(
        request_id = %request_id,
        room = %room,
        agent_name = %agent_name,
        dispatch_id = %deleted.dispatch_id,
        "Agent stopped"
    );

    Ok(Json(StopAgentResponse::from(&deleted)))
}

/// GET /api/livekit/dispatches - Dispatches for a room, for polling worker readiness
#[utoipa::path(
    get,
    path = "/api/livekit/dispatches",
    params(RoomQuery),
    responses(
        (status = 200, description = "Dispatches listed by the registry", body = DispatchesResponse),
        (status = 400, description = "Missing or invalid room", body = ErrorResponse),
        (status = 500, description = "Registry not configured or unavailable", body = ErrorResponse)
    ),
    tag = "triggers"
)]
pub async fn list_dispatches(
    State(state): State<AppState>,
    Extension(RequestIdExtension(request_id)): Extension<RequestIdExtension>,
    query: Result<Query<RoomQuery>, QueryRejection>,
) -> TriggerResult<Json<DispatchesResponse>> {
    let Query(query) = query
        .map_err(|e| TriggerError::invalid_input("query", e.body_text(), request_id.clone()))?;

    let room = parse_room(query.room_name.as_deref(), &request_id)?;
    let agent_name = query
        .agent_name
        .as_deref()
        .map(|name| {
            AgentName::parse(name)
                .map_err(|e| TriggerError::from_validation("agentName", &e, request_id.clone()))
        })
        .transpose()?;

    let reconciler = state.reconciler(&request_id)?;
    let mut dispatches = reconciler
        .list_dispatches(&room)
        .await
        .map_err(|e| TriggerError::from_reconcile(e, request_id.clone()))?;

    if let Some(agent_name) = &agent_name {
        dispatches.retain(|d| d.is_for_agent(agent_name));
    }

    Ok(Json(DispatchesResponse {
        room: room.to_string(),
        agent_name: agent_name.map(|a| a.to_string()),
        worker_running: dispatches.iter().any(|d| d.has_running_worker()),
        dispatches,
    }))
}
