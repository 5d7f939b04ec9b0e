use dispatcher_core::{Deleted, Dispatch, EnsureOutcome};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Body of `POST /api/livekit/request-agent`
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartAgentRequest {
    /// Room to dispatch the agent into
    #[serde(default)]
    pub room: Option<String>,
    /// Defaults to the configured agent name
    #[serde(default, alias = "agent_name")]
    pub agent_name: Option<String>,
    /// Defaults to the configured metadata
    #[serde(default)]
    pub metadata: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartAgentResponse {
    pub success: bool,
    /// `created` or `already_exists`
    pub outcome: String,
    pub dispatch_id: String,
    pub room: String,
    pub agent_name: String,
}

impl From<&EnsureOutcome> for StartAgentResponse {
    fn from(outcome: &EnsureOutcome) -> Self {
        let dispatch = outcome.dispatch();
        Self {
            success: true,
            outcome: outcome.as_str().to_string(),
            dispatch_id: dispatch.id.to_string(),
            room: dispatch.room.to_string(),
            agent_name: dispatch.agent_name.to_string(),
        }
    }
}

/// Room and agent selection taken from the query string
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoomQuery {
    /// Room name
    #[serde(default, rename = "room-name", alias = "roomName", alias = "room")]
    pub room_name: Option<String>,
    /// Agent name, defaults to the configured agent
    #[serde(default, rename = "agent-name", alias = "agentName")]
    pub agent_name: Option<String>,
}

/// Optional JSON body of `DELETE /api/livekit/stop-agent`
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopAgentRequest {
    #[serde(default, alias = "room_name", alias = "roomName")]
    pub room: Option<String>,
    #[serde(default, alias = "agent_name")]
    pub agent_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopAgentResponse {
    pub status: String,
    pub message: String,
    pub dispatch_id: String,
}

impl From<&Deleted> for StopAgentResponse {
    fn from(deleted: &Deleted) -> Self {
        Self {
            status: "success".to_string(),
            message: "Agent dispatch has been deleted for the room".to_string(),
            dispatch_id: deleted.dispatch_id.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchesResponse {
    pub room: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    /// Whether any listed dispatch has a running worker
    pub worker_running: bool,
    #[schema(value_type = Vec<Object>)]
    pub dispatches: Vec<Dispatch>,
}
