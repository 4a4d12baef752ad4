#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Sweeper Core
//!
//! High-performance Rust core for bulk remote-item deletion tasks.
//!
//! ## Overview
//!
//! An authenticated owner hands the engine a large list of remote-service
//! item identifiers (tweets, direct messages, mutes, blocks, favorites) and
//! gets back a live, cancellable task: the list is partitioned across a
//! bounded pool of concurrent executors, every deletion call is classified
//! (and recovered where the failure is transient), and aggregate progress
//! streams to any number of subscribers until the single terminal event.
//!
//! The surrounding web application (routing, sessions, persistence, HTML
//! serving) is out of scope; this crate is the engine those layers adapt.
//!
//! ## Module Organization
//!
//! - [`engine`] - The task engine: catalog, classifier, executor,
//!   coordinator, registry, and service facade
//! - [`events`] - Task events, observer trait, and subscriber fan-out
//! - [`remote`] - Trait seams for the external deletion API and credential
//!   resolution
//! - [`config`] - Engine tuning knobs with defaults from [`constants`]
//! - [`error`] - Structured error handling
//! - [`logging`] - Idempotent tracing setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sweeper_core::{ActionKind, BulkActionService, TaskOwner};
//!
//! # async fn example(
//! #     api: Arc<dyn sweeper_core::remote::DeletionApi>,
//! #     resolver: Arc<dyn sweeper_core::remote::CredentialResolver>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let service = BulkActionService::new(api, resolver);
//!
//! let owner = TaskOwner {
//!     user_id: "12".to_string(),
//!     screen_name: "alice".to_string(),
//! };
//! let task_id = service
//!     .create_task(owner, ActionKind::Tweet, vec!["123".to_string()])
//!     .await?;
//!
//! println!("progress: {:?}", service.snapshot(task_id)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod remote;

// Re-export the primary surface at the crate root
pub use config::EngineConfig;
pub use engine::{
    ActionDescriptor, ActionKind, BulkActionService, ProgressSnapshot, TaskCoordinator, TaskHandle,
    TaskId, TaskOwner, TaskRegistry, TaskRequest,
};
pub use error::{EngineError, EngineResult};
pub use events::{ObserverId, ProgressObserver, TaskEvent};
