//! # Task Registry
//!
//! Process-wide index of live tasks by id and by owner, plus the task-id
//! allocator. Explicitly owned and injected rather than a language-level
//! global, so the engine stays unit-testable and free of hidden state.
//!
//! Both indices live under one lock so they can never diverge: a task is
//! findable by id exactly when it appears in its owner's set.

use crate::engine::coordinator::TaskHandle;
use crate::engine::types::TaskId;
use crate::error::{EngineError, EngineResult};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Registry occupancy counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub live_tasks: usize,
    pub owners: usize,
}

#[derive(Default)]
struct RegistryIndex {
    by_id: HashMap<TaskId, TaskHandle>,
    by_owner: HashMap<String, HashSet<TaskId>>,
}

/// Index of live tasks. Tasks register on creation and deregister the
/// moment they turn terminal; a terminal task is never findable here.
pub struct TaskRegistry {
    next_id: AtomicU64,
    index: RwLock<RegistryIndex>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            index: RwLock::new(RegistryIndex::default()),
        }
    }

    /// Hand out the next task id. Monotonically increasing, never reused
    /// within a process.
    pub fn allocate_id(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a task under both indices. Rejects ids already present.
    pub fn register(&self, handle: TaskHandle) -> EngineResult<()> {
        let mut index = self.index.write();
        if index.by_id.contains_key(&handle.id()) {
            return Err(EngineError::AlreadyRegistered(handle.id()));
        }

        index
            .by_owner
            .entry(handle.owner().user_id.clone())
            .or_default()
            .insert(handle.id());
        index.by_id.insert(handle.id(), handle);
        Ok(())
    }

    /// Remove a task from both indices. A no-op when the id is unknown.
    pub fn unregister(&self, id: TaskId) {
        let mut index = self.index.write();
        let Some(handle) = index.by_id.remove(&id) else {
            return;
        };

        let user_id = &handle.owner().user_id;
        if let Some(tasks) = index.by_owner.get_mut(user_id) {
            tasks.remove(&id);
            if tasks.is_empty() {
                index.by_owner.remove(user_id);
            }
        }
        debug!(task_id = %id, "task deregistered");
    }

    pub fn get(&self, id: TaskId) -> Option<TaskHandle> {
        self.index.read().by_id.get(&id).cloned()
    }

    /// Live tasks of one owner, ordered by task id.
    pub fn tasks_of(&self, user_id: &str) -> Vec<TaskHandle> {
        let index = self.index.read();
        let Some(ids) = index.by_owner.get(user_id) else {
            return Vec::new();
        };

        let mut ids: Vec<TaskId> = ids.iter().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| index.by_id.get(&id).cloned())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.index.read().by_id.len()
    }

    pub fn stats(&self) -> RegistryStats {
        let index = self.index.read();
        RegistryStats {
            live_tasks: index.by_id.len(),
            owners: index.by_owner.len(),
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
