//! Twirp JSON bodies for `livekit.AgentDispatchService`
//!
//! Requests are sent with camelCase field names, which the server's protojson
//! decoder accepts alongside the proto names. Responses may come back in
//! either spelling depending on server options, so every multi-word field
//! carries a snake_case alias. Int64 timestamps are encoded as strings by
//! protojson and are not read.

use dispatcher_core::{
    AgentName, Dispatch, DispatchId, DispatchMetadata, Job, JobStatus, RegistryError, RoomName,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct ListDispatchRequest<'a> {
    pub room: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateDispatchRequest<'a> {
    pub room: &'a str,
    pub agent_name: &'a str,
    pub metadata: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteDispatchRequest<'a> {
    pub dispatch_id: &'a str,
    pub room: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListDispatchResponse {
    #[serde(default, rename = "agentDispatches", alias = "agent_dispatches")]
    pub agent_dispatches: Vec<WireDispatch>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDispatch {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "agentName", alias = "agent_name")]
    pub agent_name: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub state: Option<WireDispatchState>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireDispatchState {
    #[serde(default)]
    pub jobs: Vec<WireJob>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireJob {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub state: Option<WireJobState>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireJobState {
    #[serde(default)]
    pub status: Option<WireJobStatus>,
    #[serde(default, rename = "participantIdentity", alias = "participant_identity")]
    pub participant_identity: String,
}

/// Job status as either the enum name or its number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireJobStatus {
    Name(String),
    Number(i64),
}

impl WireJobStatus {
    fn to_status(&self) -> JobStatus {
        match self {
            Self::Name(name) => match name.as_str() {
                "JS_RUNNING" => JobStatus::Running,
                "JS_SUCCESS" => JobStatus::Success,
                "JS_FAILED" => JobStatus::Failed,
                _ => JobStatus::Pending,
            },
            Self::Number(1) => JobStatus::Running,
            Self::Number(2) => JobStatus::Success,
            Self::Number(3) => JobStatus::Failed,
            Self::Number(_) => JobStatus::Pending,
        }
    }
}

/// Twirp error body: `{"code": "...", "msg": "..."}`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TwirpError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub msg: String,
}

impl TryFrom<WireDispatch> for Dispatch {
    type Error = RegistryError;

    fn try_from(wire: WireDispatch) -> Result<Self, Self::Error> {
        let id = DispatchId::parse(&wire.id)
            .map_err(|e| RegistryError::protocol(format!("dispatch without id: {e}")))?;

        let jobs = wire
            .state
            .unwrap_or_default()
            .jobs
            .into_iter()
            .map(|job| {
                let state = job.state.unwrap_or_default();
                let mut converted = Job::new(
                    job.id,
                    state
                        .status
                        .as_ref()
                        .map(WireJobStatus::to_status)
                        .unwrap_or_default(),
                );
                if !state.participant_identity.is_empty() {
                    converted = converted.with_participant_identity(state.participant_identity);
                }
                converted
            })
            .collect();

        // Registry data is authoritative; names are taken as reported.
        Ok(Dispatch {
            id,
            room: RoomName::new_unchecked(wire.room),
            agent_name: AgentName::new_unchecked(wire.agent_name),
            metadata: DispatchMetadata::new(wire.metadata),
            jobs,
        })
    }
}
