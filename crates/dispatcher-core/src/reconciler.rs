//! # Dispatch Reconciler
//!
//! Converges a room toward "exactly one dispatch for this agent" or "no
//! dispatch for this agent" using only the registry's list/create/delete.
//!
//! ## Consistency
//!
//! Every operation starts from a fresh `list`; nothing is cached between
//! calls. The check-then-act gap between `list` and `create` is not closed:
//! two concurrent [`Reconciler::ensure_dispatch`] calls for the same room and
//! agent can both create. Convergence is therefore best-effort, and callers
//! that need strict exactly-once semantics must serialize calls per
//! `(room, agent)` in front of the reconciler.
//!
//! ## Failure handling
//!
//! Registry errors propagate unchanged as [`ReconcileError::Registry`]. No
//! call is retried and a failed `list` is never followed by another registry
//! call.
//!
//! ## Example
//!
//! ```rust
//! use dispatcher_core::{AgentName, DispatchMetadata, InMemoryRegistry, Reconciler, RoomName};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let reconciler = Reconciler::new(Arc::new(InMemoryRegistry::new()));
//! let room = RoomName::parse("demo-1").unwrap();
//! let agent = AgentName::default();
//! let metadata = DispatchMetadata::default();
//!
//! let first = reconciler.ensure_dispatch(&room, &agent, &metadata).await.unwrap();
//! let second = reconciler.ensure_dispatch(&room, &agent, &metadata).await.unwrap();
//! assert!(first.is_created());
//! assert!(!second.is_created());
//! # }
//! ```

use crate::dispatch::{Dispatch, DispatchMetadata};
use crate::identifiers::{AgentName, DispatchId, RoomName};
use crate::registry::{DispatchRegistry, RegistryError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on delete passes for [`Reconciler::purge_dispatches`]
pub const MAX_PURGE_PASSES: usize = 64;

/// Successful result of [`Reconciler::ensure_dispatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// No dispatch existed, a new one was created
    Created(Dispatch),
    /// A dispatch for this agent was already present
    AlreadyExists(Dispatch),
}

impl EnsureOutcome {
    /// The dispatch that now stands for this room and agent
    pub fn dispatch(&self) -> &Dispatch {
        match self {
            Self::Created(dispatch) | Self::AlreadyExists(dispatch) => dispatch,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::AlreadyExists(_) => "already_exists",
        }
    }
}

/// Successful result of [`Reconciler::remove_dispatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deleted {
    pub dispatch_id: DispatchId,
    pub room: RoomName,
    pub agent_name: AgentName,
}

/// Why a removal found nothing to delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The room has no dispatches at all
    NoDispatches,
    /// The room has dispatches, none of them for this agent
    AgentNotDispatched,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDispatches => f.write_str("No dispatches found for the room"),
            Self::AgentNotDispatched => f.write_str("Agent dispatch not found for the room"),
        }
    }
}

/// Errors returned by the reconciler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Nothing to remove; an expected outcome rather than a fault
    #[error("{reason} (room: {room}, agent: {agent_name})")]
    NotFound {
        room: RoomName,
        agent_name: AgentName,
        reason: NotFoundReason,
    },

    /// Registry call failed, passed through unchanged
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ReconcileError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for reconciler operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Stateless reconciler over a shared registry handle
///
/// Cloning is cheap and clones share the registry. The reconciler itself
/// keeps no state, so it is safe to call from any number of requests at once.
#[derive(Clone)]
pub struct Reconciler {
    registry: Arc<dyn DispatchRegistry>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(registry: Arc<dyn DispatchRegistry>) -> Self {
        Self { registry }
    }

    /// Make sure at least one dispatch for `(room, agent_name)` exists
    ///
    /// Returns [`EnsureOutcome::AlreadyExists`] when a matching dispatch is
    /// listed, whether or not its worker is running yet. Otherwise creates one
    /// and returns [`EnsureOutcome::Created`].
    pub async fn ensure_dispatch(
        &self,
        room: &RoomName,
        agent_name: &AgentName,
        metadata: &DispatchMetadata,
    ) -> ReconcileResult<EnsureOutcome> {
        let dispatches = self.registry.list(room).await?;

        if let Some(existing) = authoritative_match(&dispatches, room, agent_name) {
            debug!(
                room = %room,
                agent_name = %agent_name,
                dispatch_id = %existing.id,
                jobs = existing.jobs.len(),
                "Dispatch already exists"
            );
            return Ok(EnsureOutcome::AlreadyExists(existing.clone()));
        }

        let created = self.registry.create(room, agent_name, metadata).await?;

        info!(
            room = %room,
            agent_name = %agent_name,
            dispatch_id = %created.id,
            "Created agent dispatch"
        );

        Ok(EnsureOutcome::Created(created))
    }

    /// Delete the dispatch for `(room, agent_name)`
    ///
    /// Only the first match is deleted. When a race left duplicates behind,
    /// call again until [`ReconcileError::NotFound`] comes back, or use
    /// [`Reconciler::purge_dispatches`].
    pub async fn remove_dispatch(
        &self,
        room: &RoomName,
        agent_name: &AgentName,
    ) -> ReconcileResult<Deleted> {
        let dispatches = self.registry.list(room).await?;

        if dispatches.is_empty() {
            return Err(not_found(room, agent_name, NotFoundReason::NoDispatches));
        }

        let Some(target) = authoritative_match(&dispatches, room, agent_name) else {
            return Err(not_found(
                room,
                agent_name,
                NotFoundReason::AgentNotDispatched,
            ));
        };

        self.registry.delete(&target.id, room).await?;

        info!(
            room = %room,
            agent_name = %agent_name,
            dispatch_id = %target.id,
            "Deleted agent dispatch"
        );

        Ok(Deleted {
            dispatch_id: target.id.clone(),
            room: room.clone(),
            agent_name: agent_name.clone(),
        })
    }

    /// Current authoritative dispatch for `(room, agent_name)`, if any
    ///
    /// Used to poll worker readiness through [`Dispatch::jobs`].
    pub async fn describe_dispatch(
        &self,
        room: &RoomName,
        agent_name: &AgentName,
    ) -> ReconcileResult<Option<Dispatch>> {
        let dispatches = self.registry.list(room).await?;
        Ok(authoritative_match(&dispatches, room, agent_name).cloned())
    }

    /// Every dispatch the registry lists for `room`
    pub async fn list_dispatches(&self, room: &RoomName) -> ReconcileResult<Vec<Dispatch>> {
        Ok(self.registry.list(room).await?)
    }

    /// Remove every dispatch for `(room, agent_name)`, duplicates included
    ///
    /// Repeats [`Reconciler::remove_dispatch`] until it reports not-found, at
    /// most [`MAX_PURGE_PASSES`] times. Returns the deleted ids in order; an
    /// empty list means there was nothing to remove.
    pub async fn purge_dispatches(
        &self,
        room: &RoomName,
        agent_name: &AgentName,
    ) -> ReconcileResult<Vec<DispatchId>> {
        let mut deleted = Vec::new();

        for _ in 0..MAX_PURGE_PASSES {
            match self.remove_dispatch(room, agent_name).await {
                Ok(removed) => deleted.push(removed.dispatch_id),
                Err(ReconcileError::NotFound { .. }) => return Ok(deleted),
                Err(err) => return Err(err),
            }
        }

        warn!(
            room = %room,
            agent_name = %agent_name,
            deleted = deleted.len(),
            "Purge stopped at pass limit; registry still lists dispatches"
        );
        Ok(deleted)
    }
}

/// First dispatch in list order for this agent
fn authoritative_match<'a>(
    dispatches: &'a [Dispatch],
    room: &RoomName,
    agent_name: &AgentName,
) -> Option<&'a Dispatch> {
    let mut matches = dispatches.iter().filter(|d| d.is_for_agent(agent_name));
    let first = matches.next()?;

    let duplicates = matches.count();
    if duplicates > 0 {
        warn!(
            room = %room,
            agent_name = %agent_name,
            dispatch_id = %first.id,
            duplicates,
            "Registry lists duplicate dispatches for agent"
        );
    }

    Some(first)
}

fn not_found(room: &RoomName, agent_name: &AgentName, reason: NotFoundReason) -> ReconcileError {
    ReconcileError::NotFound {
        room: room.clone(),
        agent_name: agent_name.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::{InMemoryRegistry, RegistryOperation};

    fn room() -> RoomName {
        RoomName::parse("demo-1").unwrap()
    }

    fn agent() -> AgentName {
        AgentName::parse("livekit-agent").unwrap()
    }

    fn setup() -> (Arc<InMemoryRegistry>, Reconciler) {
        let registry = Arc::new(InMemoryRegistry::new());
        let reconciler = Reconciler::new(registry.clone());
        (registry, reconciler)
    }

    #[tokio::test]
    async fn test_ensure_creates_then_reports_existing() {
        let (registry, reconciler) = setup();
        let metadata = DispatchMetadata::from("job-metadata");

        let first = reconciler
            .ensure_dispatch(&room(), &agent(), &metadata)
            .await
            .unwrap();
        let second = reconciler
            .ensure_dispatch(&room(), &agent(), &metadata)
            .await
            .unwrap();

        assert!(first.is_created());
        assert_eq!(second.as_str(), "already_exists");
        assert_eq!(first.dispatch().id, second.dispatch().id);
        assert_eq!(registry.dispatches_for(&room(), &agent()).len(), 1);
        assert_eq!(first.dispatch().metadata.as_str(), "job-metadata");
    }

    #[tokio::test]
    async fn test_ensure_picks_first_of_duplicates() {
        let (registry, reconciler) = setup();
        let first = registry.seed(&room(), &agent());
        registry.seed(&room(), &agent());

        let outcome = reconciler
            .ensure_dispatch(&room(), &agent(), &DispatchMetadata::default())
            .await
            .unwrap();

        assert_eq!(outcome, EnsureOutcome::AlreadyExists(first));
        assert_eq!(registry.call_count(RegistryOperation::Create), 0);
    }

    #[tokio::test]
    async fn test_ensure_ignores_other_agents() {
        let (registry, reconciler) = setup();
        registry.seed(&room(), &AgentName::parse("other-agent").unwrap());

        let outcome = reconciler
            .ensure_dispatch(&room(), &agent(), &DispatchMetadata::default())
            .await
            .unwrap();

        assert!(outcome.is_created());
        assert_eq!(registry.list_snapshot(&room()).len(), 2);
    }

    #[tokio::test]
    async fn test_remove_after_ensure_leaves_nothing() {
        let (registry, reconciler) = setup();
        let created = reconciler
            .ensure_dispatch(&room(), &agent(), &DispatchMetadata::default())
            .await
            .unwrap();

        let deleted = reconciler.remove_dispatch(&room(), &agent()).await.unwrap();

        assert_eq!(deleted.dispatch_id, created.dispatch().id);
        assert!(registry.dispatches_for(&room(), &agent()).is_empty());
    }

    #[tokio::test]
    async fn test_remove_on_empty_room_is_not_found() {
        let (registry, reconciler) = setup();

        let err = reconciler
            .remove_dispatch(&room(), &agent())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::NotFound {
                reason: NotFoundReason::NoDispatches,
                ..
            }
        ));
        assert_eq!(registry.call_count(RegistryOperation::Delete), 0);
    }

    #[tokio::test]
    async fn test_remove_with_only_other_agents_is_not_found() {
        let (registry, reconciler) = setup();
        let other = registry.seed(&room(), &AgentName::parse("other-agent").unwrap());

        let err = reconciler
            .remove_dispatch(&room(), &agent())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::NotFound {
                reason: NotFoundReason::AgentNotDispatched,
                ..
            }
        ));
        assert_eq!(registry.list_snapshot(&room()), vec![other]);
    }

    #[tokio::test]
    async fn test_remove_deletes_one_duplicate_per_call() {
        let (registry, reconciler) = setup();
        let first = registry.seed(&room(), &agent());
        let second = registry.seed(&room(), &agent());

        let deleted = reconciler.remove_dispatch(&room(), &agent()).await.unwrap();
        assert_eq!(deleted.dispatch_id, first.id);
        assert_eq!(registry.dispatches_for(&room(), &agent()), vec![second]);
    }

    #[tokio::test]
    async fn test_list_failure_propagates_without_further_calls() {
        let (registry, reconciler) = setup();
        let failure = RegistryError::connection("connection refused");
        registry.fail_next(RegistryOperation::List, failure.clone());

        let err = reconciler
            .ensure_dispatch(&room(), &agent(), &DispatchMetadata::default())
            .await
            .unwrap_err();
        assert_eq!(err, ReconcileError::Registry(failure.clone()));

        registry.fail_next(RegistryOperation::List, failure.clone());
        let err = reconciler
            .remove_dispatch(&room(), &agent())
            .await
            .unwrap_err();
        assert_eq!(err, ReconcileError::Registry(failure));

        assert_eq!(registry.call_count(RegistryOperation::List), 2);
        assert_eq!(registry.call_count(RegistryOperation::Create), 0);
        assert_eq!(registry.call_count(RegistryOperation::Delete), 0);
    }

    #[tokio::test]
    async fn test_create_and_delete_failures_propagate() {
        let (registry, reconciler) = setup();
        registry.fail_next(RegistryOperation::Create, RegistryError::timeout("deadline"));

        let err = reconciler
            .ensure_dispatch(&room(), &agent(), &DispatchMetadata::default())
            .await
            .unwrap_err();
        assert_eq!(err, ReconcileError::Registry(RegistryError::timeout("deadline")));

        registry.seed(&room(), &agent());
        registry.fail_next(
            RegistryOperation::Delete,
            RegistryError::rejected(500, "internal"),
        );
        let err = reconciler
            .remove_dispatch(&room(), &agent())
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(registry.dispatches_for(&room(), &agent()).len(), 1);
    }

    #[tokio::test]
    async fn test_describe_dispatch() {
        let (registry, reconciler) = setup();
        assert_eq!(
            reconciler.describe_dispatch(&room(), &agent()).await.unwrap(),
            None
        );

        let seeded = registry.seed(&room(), &agent());
        assert_eq!(
            reconciler.describe_dispatch(&room(), &agent()).await.unwrap(),
            Some(seeded)
        );
    }

    #[tokio::test]
    async fn test_purge_removes_duplicates() {
        let (registry, reconciler) = setup();
        let other = registry.seed(&room(), &AgentName::parse("other-agent").unwrap());
        let a = registry.seed(&room(), &agent());
        let b = registry.seed(&room(), &agent());

        let deleted = reconciler.purge_dispatches(&room(), &agent()).await.unwrap();

        assert_eq!(deleted, vec![a.id, b.id]);
        assert_eq!(reconciler.list_dispatches(&room()).await.unwrap(), vec![other]);

        let again = reconciler.purge_dispatches(&room(), &agent()).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_purge_stops_on_transport_error() {
        let (registry, reconciler) = setup();
        registry.seed(&room(), &agent());
        registry.fail_next(RegistryOperation::Delete, RegistryError::connection("reset"));

        let err = reconciler
            .purge_dispatches(&room(), &agent())
            .await
            .unwrap_err();
        assert_eq!(err, ReconcileError::Registry(RegistryError::connection("reset")));
    }

    #[test]
    fn test_not_found_messages() {
        let err = not_found(&room(), &agent(), NotFoundReason::NoDispatches);
        assert_eq!(
            err.to_string(),
            "No dispatches found for the room (room: demo-1, agent: livekit-agent)"
        );
        assert_eq!(
            NotFoundReason::AgentNotDispatched.to_string(),
            "Agent dispatch not found for the room"
        );
    }
}
