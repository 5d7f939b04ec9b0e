use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::dispatch::{Dispatch, DispatchMetadata, Job};
use crate::identifiers::{AgentName, DispatchId, RoomName};
use crate::registry::{DispatchRegistry, RegistryError, RegistryResult};

/// Registry primitive, used to count calls and queue failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryOperation {
    List,
    Create,
    Delete,
}

#[derive(Default)]
struct RegistryState {
    /// Insertion order doubles as list order
    dispatches: Vec<Dispatch>,
    next_id: u64,
    calls: HashMap<RegistryOperation, usize>,
    failures: HashMap<RegistryOperation, VecDeque<RegistryError>>,
}

impl RegistryState {
    fn record(&mut self, operation: RegistryOperation) -> RegistryResult<()> {
        *self.calls.entry(operation).or_default() += 1;
        match self
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn insert(
        &mut self,
        room: &RoomName,
        agent_name: &AgentName,
        metadata: &DispatchMetadata,
    ) -> Dispatch {
        self.next_id += 1;
        let dispatch = Dispatch::new(
            DispatchId::new_unchecked(format!("AD_{:08}", self.next_id)),
            room.clone(),
            agent_name.clone(),
            metadata.clone(),
        );
        self.dispatches.push(dispatch.clone());
        dispatch
    }
}

/// Process-local dispatch registry with the same contract as the remote one.
///
/// `create` never checks for duplicates and `delete` of an unknown id fails
/// with [`RegistryError::DispatchNotFound`], so the reconciler sees exactly
/// the behaviour it has to cope with in production. Failures can be queued
/// per operation with [`fail_next`](Self::fail_next), and every call is
/// counted.
///
/// Used by tests and by `dispatcher serve --in-memory` for local runs.
///
/// # Example
///
/// ```rust
/// use dispatcher_core::{AgentName, InMemoryRegistry, RoomName};
///
/// let registry = InMemoryRegistry::new();
/// let room = RoomName::parse("demo-1").unwrap();
/// registry.seed(&room, &AgentName::default());
/// assert_eq!(registry.list_snapshot(&room).len(), 1);
/// ```
#[derive(Default)]
pub struct InMemoryRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        // State stays consistent across a panicking test thread.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a dispatch directly, bypassing call counting
    pub fn seed(&self, room: &RoomName, agent_name: &AgentName) -> Dispatch {
        self.state()
            .insert(room, agent_name, &DispatchMetadata::default())
    }

    /// Attach a worker job to an existing dispatch, as the registry does once
    /// a worker accepts it
    pub fn attach_job(&self, dispatch_id: &DispatchId, job: Job) -> bool {
        let mut state = self.state();
        match state.dispatches.iter_mut().find(|d| &d.id == dispatch_id) {
            Some(dispatch) => {
                dispatch.jobs.push(job);
                true
            }
            None => false,
        }
    }

    /// Make the next call of `operation` fail with `error`
    ///
    /// Failures queue up; each call consumes one.
    pub fn fail_next(&self, operation: RegistryOperation, error: RegistryError) {
        self.state()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Number of calls made for `operation`, failed ones included
    pub fn call_count(&self, operation: RegistryOperation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Dispatches for `room` in list order, without counting a call
    pub fn list_snapshot(&self, room: &RoomName) -> Vec<Dispatch> {
        self.state()
            .dispatches
            .iter()
            .filter(|d| &d.room == room)
            .cloned()
            .collect()
    }

    /// Dispatches for `(room, agent_name)` in list order
    pub fn dispatches_for(&self, room: &RoomName, agent_name: &AgentName) -> Vec<Dispatch> {
        self.list_snapshot(room)
            .into_iter()
            .filter(|d| d.is_for_agent(agent_name))
            .collect()
    }

    /// Total number of dispatches across all rooms
    pub fn len(&self) -> usize {
        self.state().dispatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DispatchRegistry for InMemoryRegistry {
    async fn list(&self, room: &RoomName) -> RegistryResult<Vec<Dispatch>> {
        let mut state = self.state();
        state.record(RegistryOperation::List)?;
        Ok(state
            .dispatches
            .iter()
            .filter(|d| &d.room == room)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        room: &RoomName,
        agent_name: &AgentName,
        metadata: &DispatchMetadata,
    ) -> RegistryResult<Dispatch> {
        let mut state = self.state();
        state.record(RegistryOperation::Create)?;
        Ok(state.insert(room, agent_name, metadata))
    }

    async fn delete(&self, dispatch_id: &DispatchId, room: &RoomName) -> RegistryResult<()> {
        let mut state = self.state();
        state.record(RegistryOperation::Delete)?;

        let position = state
            .dispatches
            .iter()
            .position(|d| &d.id == dispatch_id && &d.room == room)
            .ok_or_else(|| RegistryError::dispatch_not_found(dispatch_id, room))?;
        state.dispatches.remove(position);
        Ok(())
    }
}
