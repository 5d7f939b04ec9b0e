//! Dispatch records as reported by the registry

use crate::identifiers::{AgentName, DispatchId, RoomName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque metadata handed through to the agent worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispatchMetadata(String);

impl DispatchMetadata {
    pub fn new(metadata: impl Into<String>) -> Self {
        Self(metadata.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for DispatchMetadata {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DispatchMetadata {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle of a worker job started for a dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Finished jobs no longer hold a worker in the room
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a worker job the registry started for a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Identity the worker joined the room with, once it has joined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_identity: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            participant_identity: None,
        }
    }

    pub fn with_participant_identity(mut self, identity: impl Into<String>) -> Self {
        self.participant_identity = Some(identity.into());
        self
    }
}

/// One outstanding request for an agent worker to join a room
///
/// The registry owns these records. Nothing here is cached between calls;
/// a `Dispatch` is a snapshot of what the last `list` or `create` returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispatch {
    pub id: DispatchId,
    pub room: RoomName,
    pub agent_name: AgentName,
    #[serde(default)]
    pub metadata: DispatchMetadata,
    /// Empty right after creation, filled in once a worker picks the dispatch up
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl Dispatch {
    pub fn new(
        id: DispatchId,
        room: RoomName,
        agent_name: AgentName,
        metadata: DispatchMetadata,
    ) -> Self {
        Self {
            id,
            room,
            agent_name,
            metadata,
            jobs: Vec::new(),
        }
    }

    pub fn with_job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn is_for_agent(&self, agent_name: &AgentName) -> bool {
        &self.agent_name == agent_name
    }

    /// Whether any worker job for this dispatch is currently running
    pub fn has_running_worker(&self) -> bool {
        self.jobs.iter().any(|job| job.status == JobStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dispatch {
        Dispatch::new(
            DispatchId::new_unchecked("AD_1"),
            RoomName::new_unchecked("demo-1"),
            AgentName::default(),
            DispatchMetadata::from("job-metadata"),
        )
    }

    #[test]
    fn test_new_dispatch_has_no_jobs() {
        let dispatch = sample();
        assert!(dispatch.jobs.is_empty());
        assert!(!dispatch.has_running_worker());
    }

    #[test]
    fn test_running_worker_detection() {
        let dispatch = sample()
            .with_job(Job::new("J_1", JobStatus::Failed))
            .with_job(Job::new("J_2", JobStatus::Running).with_participant_identity("agent-J_2"));
        assert!(dispatch.has_running_worker());

        let finished = sample().with_job(Job::new("J_1", JobStatus::Success));
        assert!(!finished.has_running_worker());
        assert!(JobStatus::Success.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn test_agent_match() {
        let dispatch = sample();
        assert!(dispatch.is_for_agent(&AgentName::default()));
        assert!(!dispatch.is_for_agent(&AgentName::new_unchecked("other-agent")));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(
            sample().with_job(Job::new("J_1", JobStatus::Running)),
        )
        .unwrap();
        assert_eq!(json["id"], "AD_1");
        assert_eq!(json["agentName"], "livekit-agent");
        assert_eq!(json["metadata"], "job-metadata");
        assert_eq!(json["jobs"][0]["status"], "running");
        assert!(json["jobs"][0].get("participantIdentity").is_none());
    }
}
