//! Wire-visible task events.

use crate::engine::types::{ProgressSnapshot, TaskId};
use serde::Serialize;

/// One event pushed to task subscribers.
///
/// A task emits any number of `progress` events followed by exactly one
/// terminal event: `task-end` on natural completion, `task-cancel` on
/// explicit cancellation, or `task-error` when an executor dies. The
/// terminal variants are mutually exclusive.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum TaskEvent {
    Progress {
        snapshot: ProgressSnapshot,
    },
    TaskEnd {
        id: TaskId,
        snapshot: ProgressSnapshot,
        elapsed_seconds: i64,
    },
    TaskCancel {
        id: TaskId,
    },
    TaskError {
        id: TaskId,
        reason: String,
    },
}

impl TaskEvent {
    /// Wire name of the event, matching its serde tag.
    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::Progress { .. } => "progress",
            TaskEvent::TaskEnd { .. } => "task-end",
            TaskEvent::TaskCancel { .. } => "task-cancel",
            TaskEvent::TaskError { .. } => "task-error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskEvent::Progress { .. })
    }
}
