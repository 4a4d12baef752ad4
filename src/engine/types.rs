//! # Engine Core Types
//!
//! Shared data types for the task engine: task identity and ownership,
//! progress counters, the error histogram, and the wire-visible progress
//! snapshot pushed to subscribers.

use crate::engine::catalog::ActionKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Process-wide unique task identifier. Monotonically increasing, assigned
/// at creation, never reused within a process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity a task acts on behalf of. Immutable for the task's life;
/// credential material is resolved separately and never travels with the
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOwner {
    pub user_id: String,
    pub screen_name: String,
}

/// Incremental `{done, failed}` report for one completed chunk. Deltas, not
/// cumulative totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressDelta {
    pub done: u64,
    pub failed: u64,
}

/// Aggregate progress counters for one task.
///
/// `total` is fixed at creation; the other three move only through
/// [`TaskCounters::apply`], which preserves
/// `done + failed + remaining == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounters {
    pub done: u64,
    pub failed: u64,
    pub remaining: u64,
    pub total: u64,
}

impl TaskCounters {
    pub fn new(total: u64) -> Self {
        Self {
            done: 0,
            failed: 0,
            remaining: total,
            total,
        }
    }

    /// Apply one executor delta.
    pub fn apply(&mut self, delta: ProgressDelta) {
        self.done += delta.done;
        self.failed += delta.failed;
        self.remaining = self.remaining.saturating_sub(delta.done + delta.failed);
    }

    /// Completion percentage, recomputed from scratch so it can never drift
    /// or exceed 100. Defined as 0 when `total` is 0.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.done + self.failed) as f64 / self.total as f64 * 100.0
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.done + self.failed + self.remaining == self.total
    }
}

/// Occurrence count and last-seen message for one remote error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTally {
    pub count: u64,
    pub last_message: String,
}

/// Merge a chunk-local histogram delta into the task's accumulated
/// histogram. Counts add; the message reflects the most recent occurrence.
pub fn merge_histogram(target: &mut HashMap<u32, ErrorTally>, delta: HashMap<u32, ErrorTally>) {
    for (code, tally) in delta {
        target
            .entry(code)
            .and_modify(|existing| {
                existing.count += tally.count;
                existing.last_message = tally.last_message.clone();
            })
            .or_insert(tally);
    }
}

/// The externally visible progress state of a task at a point in time.
///
/// Recomputed on every delta and pushed to subscribers; a late subscriber
/// receives the current snapshot immediately on subscribe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub id: TaskId,
    pub kind: ActionKind,
    pub done: u64,
    pub failed: u64,
    pub remaining: u64,
    pub total: u64,
    pub percentage: f64,
    pub errors: HashMap<u32, ErrorTally>,
}

impl ProgressSnapshot {
    /// Snapshot of a freshly created task: nothing done, nothing failed.
    pub fn initial(id: TaskId, kind: ActionKind, total: u64) -> Self {
        Self::project(id, kind, &TaskCounters::new(total), &HashMap::new())
    }

    /// Project the coordinator's current state into wire form.
    pub fn project(
        id: TaskId,
        kind: ActionKind,
        counters: &TaskCounters,
        errors: &HashMap<u32, ErrorTally>,
    ) -> Self {
        Self {
            id,
            kind,
            done: counters.done,
            failed: counters.failed,
            remaining: counters.remaining,
            total: counters.total,
            percentage: counters.percentage(),
            errors: errors.clone(),
        }
    }
}
