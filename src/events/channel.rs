//! Observer handles and subscriber fan-out.

use crate::events::types::TaskEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

/// Opaque handle identifying one subscription. Returned from subscribe and
/// required to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverId(Uuid);

impl ObserverId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receives task events. Delivery is fire-and-forget, at-most-once per
/// call; implementations must not block the coordinator loop.
pub trait ProgressObserver: Send + Sync {
    fn deliver(&self, event: &TaskEvent);
}

/// The set of observers subscribed to one task. Mutated only by the task's
/// coordinator loop; the task does not own observer lifecycles.
#[derive(Default)]
pub struct SubscriberSet {
    observers: HashMap<ObserverId, Arc<dyn ProgressObserver>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ObserverId, observer: Arc<dyn ProgressObserver>) {
        self.observers.insert(id, observer);
    }

    /// Remove an observer. Never errors when the id was not subscribed.
    pub fn remove(&mut self, id: &ObserverId) -> bool {
        self.observers.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver an event to every subscriber.
    pub fn broadcast(&self, event: &TaskEvent) {
        trace!(
            event = event.name(),
            subscribers = self.observers.len(),
            "broadcasting task event"
        );
        for observer in self.observers.values() {
            observer.deliver(event);
        }
    }
}
