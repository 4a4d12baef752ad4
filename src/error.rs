//! # Engine Error Types
//!
//! Structured error handling for the task engine using thiserror instead of
//! `Box<dyn Error>` patterns. These cover the synchronous rejection paths of
//! the public surface; per-item failures during execution are never raised
//! as errors, only absorbed into task counters and the error histogram.

use crate::engine::types::TaskId;
use thiserror::Error;

/// Errors surfaced by the engine's public operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown action kind: {kind}")]
    UnknownKind { kind: String },

    #[error("task item list is empty")]
    EmptyItemList,

    #[error("no credentials found for owner {owner_id}")]
    CredentialsNotFound { owner_id: String },

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("task {0} is already registered")]
    AlreadyRegistered(TaskId),
}

pub type EngineResult<T> = Result<T, EngineError>;
