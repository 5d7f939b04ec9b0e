//! HTTP handlers

pub mod health;
pub mod triggers;
pub mod types;

pub use health::health_check;
pub use triggers::{list_dispatches, request_agent, stop_agent};
pub use types::{
    DispatchesResponse, RoomQuery, StartAgentRequest, StartAgentResponse, StopAgentRequest,
    StopAgentResponse,
};
