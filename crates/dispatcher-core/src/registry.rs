//! Dispatch registry contract
//!
//! The registry is the remote service of record for dispatches. It offers
//! three coarse primitives and nothing else: no create-if-absent, no exists
//! check, no compare-and-swap.
//!
//! # Contract
//!
//! | Operation | Behaviour |
//! |-----------|-----------|
//! | [`list`](DispatchRegistry::list) | All dispatches for a room, unspecified order, eventually consistent |
//! | [`create`](DispatchRegistry::create) | Always creates a new dispatch, never checks for duplicates |
//! | [`delete`](DispatchRegistry::delete) | Deletes by id, fails if the id is unknown under that room |
//!
//! Any call may fail with a [`RegistryError`]. Implementations must surface
//! those failures as-is and must not retry on their own.

use crate::dispatch::{Dispatch, DispatchMetadata};
use crate::identifiers::{AgentName, DispatchId, RoomName};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for registry calls
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Transport-level failures talking to the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Registry could not be reached
    #[error("registry connection failed: {message}")]
    Connection { message: String },

    /// Registry did not answer in time
    #[error("registry request timed out: {message}")]
    Timeout { message: String },

    /// Registry rejected our credentials
    #[error("registry authentication failed: {message}")]
    Authentication { message: String },

    /// Dispatch id unknown under the given room
    #[error("dispatch {dispatch_id} not found in room {room}")]
    DispatchNotFound { dispatch_id: String, room: String },

    /// Registry answered with an error status
    #[error("registry rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Registry answered with something we could not decode
    #[error("registry protocol error: {message}")]
    Protocol { message: String },
}

impl RegistryError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn dispatch_not_found(dispatch_id: &DispatchId, room: &RoomName) -> Self {
        Self::DispatchNotFound {
            dispatch_id: dispatch_id.to_string(),
            room: room.to_string(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Whether a caller could reasonably retry the same call
    ///
    /// Nothing in this workspace retries; this only informs callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 502,
            _ => false,
        }
    }
}

/// Typed interface over the remote dispatch registry
#[async_trait]
pub trait DispatchRegistry: Send + Sync {
    /// List every dispatch currently associated with `room`
    async fn list(&self, room: &RoomName) -> RegistryResult<Vec<Dispatch>>;

    /// Create a new dispatch, even if an identical one already exists
    async fn create(
        &self,
        room: &RoomName,
        agent_name: &AgentName,
        metadata: &DispatchMetadata,
    ) -> RegistryResult<Dispatch>;

    /// Delete a dispatch by id
    async fn delete(&self, dispatch_id: &DispatchId, room: &RoomName) -> RegistryResult<()>;
}
