//! # Dispatcher
//!
//! Keeps exactly one agent worker dispatched per conference room. Callers ask
//! for an agent in a room; the reconciler checks the room's current dispatches
//! in the remote registry and only creates one when none exists for that agent.
//!
//! ## Core Components
//!
//! - **[Reconciler]**: idempotent ensure/remove over a [DispatchRegistry]
//! - **[LiveKitDispatchClient]**: LiveKit agent dispatch service behind the registry seam
//! - **[InMemoryRegistry]**: process-local registry for tests and local runs
//! - **[router]**: axum trigger endpoints for browser clients
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dispatcher::{AgentName, DispatchMetadata, InMemoryRegistry, Reconciler, RoomName};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reconciler = Reconciler::new(Arc::new(InMemoryRegistry::new()));
//! let room = RoomName::parse("demo-1")?;
//! let agent = AgentName::default();
//!
//! let first = reconciler.ensure_dispatch(&room, &agent, &DispatchMetadata::default()).await?;
//! let second = reconciler.ensure_dispatch(&room, &agent, &DispatchMetadata::default()).await?;
//! assert!(first.is_created());
//! assert!(!second.is_created());
//! assert_eq!(first.dispatch().id, second.dispatch().id);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Module aliases for namespaced access
// ============================================================================

pub use dispatcher_core as core;
pub use dispatcher_http as http;
pub use dispatcher_livekit as livekit;

// ============================================================================
// Flat re-exports
// ============================================================================

pub use dispatcher_core::{
    AgentName, Deleted, Dispatch, DispatchId, DispatchMetadata, DispatchRegistry, EnsureOutcome,
    InMemoryRegistry, Job, JobStatus, NotFoundReason, ReconcileError, Reconciler, RegistryError,
    RoomName,
};
pub use dispatcher_http::{AppState, DispatcherConfig, DispatcherConfigBuilder, router};
pub use dispatcher_livekit::{LiveKitConfig, LiveKitDispatchClient};
