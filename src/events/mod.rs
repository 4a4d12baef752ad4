//! # Progress Event System
//!
//! The delivery contract between a task coordinator and its observers:
//! the wire-visible [`TaskEvent`] enum, the fire-and-forget
//! [`ProgressObserver`] trait, and the [`SubscriberSet`] fan-out used by the
//! coordinator loop. The transport behind an observer (websocket, channel,
//! test collector) is out of scope; only `deliver` is required.

pub mod channel;
pub mod types;

// Re-export key types for convenience
pub use channel::{ObserverId, ProgressObserver, SubscriberSet};
pub use types::TaskEvent;
