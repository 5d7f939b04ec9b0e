//! # Dispatcher Core
//!
//! Data model, registry contract and reconciler for keeping exactly one agent
//! worker dispatched to a conference room.
//!
//! ## Components
//!
//! - **[`DispatchRegistry`]**: typed seam over the remote registry's
//!   list/create/delete primitives
//! - **[`Reconciler`]**: idempotent `ensure_dispatch` / `remove_dispatch` on
//!   top of that seam
//! - **[`InMemoryRegistry`]**: process-local registry with the same contract,
//!   for tests and local runs
//! - **Identifiers**: validated [`RoomName`], [`AgentName`], [`DispatchId`]

pub mod dispatch;
pub mod identifiers;
pub mod in_memory;
pub mod reconciler;
pub mod registry;
pub mod secret;

pub use dispatch::{Dispatch, DispatchMetadata, Job, JobStatus};
pub use identifiers::{AgentName, DispatchId, IdValidationError, RoomName};
pub use in_memory::{InMemoryRegistry, RegistryOperation};
pub use reconciler::{
    Deleted, EnsureOutcome, NotFoundReason, ReconcileError, ReconcileResult, Reconciler,
};
pub use registry::{DispatchRegistry, RegistryError, RegistryResult};
pub use secret::SecretString;
