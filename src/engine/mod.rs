//! # Bulk Action Task Engine
//!
//! Core engine for bulk deletion of remote-service items: partitions a
//! large identifier list across a bounded pool of concurrent executors,
//! drives each external deletion call, classifies and recovers from partial
//! failures, aggregates live progress, and exposes a cancellable,
//! subscribable task abstraction.
//!
//! ## Core Components
//!
//! - **ActionCatalog** (`catalog`): static per-kind call shapes (verb,
//!   request builder, chunk size, rate-limit retry flag)
//! - **CallOutcome classifier** (`classifier`): maps every remote result
//!   onto a closed outcome set the executor pattern-matches on
//! - **PartitionExecutor** (`executor`): drives one partition chunk by
//!   chunk; the unit of parallelism
//! - **TaskCoordinator** (`coordinator`): per-task lifecycle actor that
//!   merges executor deltas and fans events out to subscribers
//! - **TaskRegistry** (`registry`): injected index of live tasks by id and
//!   owner
//! - **BulkActionService** (`service`): the exposed surface for an API
//!   layer

pub mod catalog;
pub mod classifier;
pub mod coordinator;
pub mod executor;
pub mod registry;
pub mod service;
pub mod types;

// Re-export core types and components for easy access
pub use catalog::{ActionDescriptor, ActionKind};
pub use classifier::{classify, CallOutcome};
pub use coordinator::{
    partition_count, partition_items, ControlMessage, TaskCoordinator, TaskHandle, TaskRequest,
};
pub use executor::{ExecutorSignal, PartitionExecutor};
pub use registry::{RegistryStats, TaskRegistry};
pub use service::BulkActionService;
pub use types::{
    merge_histogram, ErrorTally, ProgressDelta, ProgressSnapshot, TaskCounters, TaskId, TaskOwner,
};
