//! # Task Coordinator
//!
//! Owns one task's lifecycle: partitions the identifier list, spawns one
//! [`PartitionExecutor`](crate::engine::executor::PartitionExecutor) per
//! partition, merges their incremental reports into a single progress
//! snapshot, fans events out to subscribers, and handles cancellation and
//! termination.
//!
//! ## Single-writer discipline
//!
//! All mutable task state (counters, histogram, subscriber set, executor
//! set) lives inside the coordinator's actor loop. Executors and the public
//! surface talk to it exclusively through channels, so counter mutation is
//! serialized by construction and progress deltas from different executors
//! may interleave in any order without lost updates.
//!
//! ## Termination
//!
//! A task broadcasts exactly one terminal event: `task-end` when the last
//! executor finishes, `task-cancel` on explicit cancellation, or
//! `task-error` when an executor dies. The coordinator deregisters the task
//! from the registry in the same step; terminal tasks are not retained.

use crate::config::EngineConfig;
use crate::engine::catalog::{ActionDescriptor, ActionKind};
use crate::engine::executor::{ExecutorSignal, PartitionExecutor};
use crate::engine::registry::TaskRegistry;
use crate::engine::types::{
    merge_histogram, ErrorTally, ProgressSnapshot, TaskCounters, TaskId, TaskOwner,
};
use crate::error::{EngineError, EngineResult};
use crate::events::{ObserverId, ProgressObserver, SubscriberSet, TaskEvent};
use crate::remote::{DeletionApi, RemoteCredentials};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

/// Everything needed to start one bulk action task.
pub struct TaskRequest {
    pub owner: TaskOwner,
    pub kind: ActionKind,
    pub items: Vec<String>,
    /// Requested executor count; collapsed to one for small batches and
    /// never more than the item count.
    pub partition_hint: usize,
    pub credentials: RemoteCredentials,
}

/// Control messages from the public surface into the coordinator loop.
pub enum ControlMessage {
    Subscribe {
        observer_id: ObserverId,
        observer: Arc<dyn ProgressObserver>,
    },
    Unsubscribe {
        observer_id: ObserverId,
    },
    Cancel,
}

struct TaskHandleInner {
    id: TaskId,
    owner: TaskOwner,
    kind: ActionKind,
    started_at: DateTime<Utc>,
    snapshot: RwLock<ProgressSnapshot>,
    control: mpsc::UnboundedSender<ControlMessage>,
}

/// Shareable handle to a live task.
///
/// Reads (id, owner, last snapshot) are synchronous; mutations are messages
/// into the coordinator loop and may race with termination, in which case
/// they are silently dropped: the task is already gone.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<TaskHandleInner>,
}

impl TaskHandle {
    fn new(
        id: TaskId,
        owner: TaskOwner,
        kind: ActionKind,
        snapshot: ProgressSnapshot,
        control: mpsc::UnboundedSender<ControlMessage>,
    ) -> Self {
        Self {
            inner: Arc::new(TaskHandleInner {
                id,
                owner,
                kind,
                started_at: Utc::now(),
                snapshot: RwLock::new(snapshot),
                control,
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn owner(&self) -> &TaskOwner {
        &self.inner.owner
    }

    pub fn kind(&self) -> ActionKind {
        self.inner.kind
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// The last computed progress snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner.snapshot.read().clone()
    }

    /// Subscribe an observer. The coordinator delivers the current snapshot
    /// to it immediately, so a late subscriber does not wait for the next
    /// delta.
    pub fn subscribe(&self, observer: Arc<dyn ProgressObserver>) -> ObserverId {
        let observer_id = ObserverId::new();
        let _ = self.inner.control.send(ControlMessage::Subscribe {
            observer_id,
            observer,
        });
        observer_id
    }

    /// Remove an observer. Never errors when it was not subscribed.
    pub fn unsubscribe(&self, observer_id: ObserverId) {
        let _ = self
            .inner
            .control
            .send(ControlMessage::Unsubscribe { observer_id });
    }

    /// Request cancellation. Idempotent; a no-op once the task is terminal.
    pub fn cancel(&self) {
        let _ = self.inner.control.send(ControlMessage::Cancel);
    }

    fn store_snapshot(&self, snapshot: ProgressSnapshot) {
        *self.inner.snapshot.write() = snapshot;
    }
}

/// Effective number of partition executors for an item count.
///
/// Lists below the small-batch threshold always get exactly one executor;
/// otherwise the hint applies, clamped to `[1, len]`.
pub fn partition_count(len: usize, hint: usize, small_batch_threshold: usize) -> usize {
    if len < small_batch_threshold {
        1
    } else {
        hint.clamp(1, len)
    }
}

/// Split `items` into `parts` contiguous, order-preserving, gap-free slices.
/// Sizes differ by at most one, larger slices first.
pub fn partition_items(items: Vec<String>, parts: usize) -> Vec<Vec<String>> {
    let parts = parts.clamp(1, items.len().max(1));
    let base = items.len() / parts;
    let remainder = items.len() % parts;

    let mut partitions = Vec::with_capacity(parts);
    let mut rest = items;
    for index in 0..parts {
        let take = base + usize::from(index < remainder);
        let tail = rest.split_off(take.min(rest.len()));
        partitions.push(rest);
        rest = tail;
    }
    partitions
}

/// Spawns and supervises one task. See the module docs for the lifecycle.
pub struct TaskCoordinator;

impl TaskCoordinator {
    /// Validate the request, register the task, and start its executors.
    ///
    /// Returns immediately; execution proceeds asynchronously. Rejections
    /// (empty item list, registry conflict) happen before any executor
    /// starts, so no partial task is ever left registered.
    #[instrument(skip(request, registry, api, config), fields(kind = %request.kind, items = request.items.len()))]
    pub fn spawn(
        request: TaskRequest,
        registry: &Arc<TaskRegistry>,
        api: Arc<dyn DeletionApi>,
        config: &EngineConfig,
    ) -> EngineResult<TaskHandle> {
        if request.items.is_empty() {
            return Err(EngineError::EmptyItemList);
        }

        let descriptor = ActionDescriptor::resolve(request.kind);
        let chunk_size = config
            .chunk_size_override
            .unwrap_or(descriptor.chunk_size)
            .max(1);

        let total = request.items.len() as u64;
        let parts = partition_count(
            request.items.len(),
            request.partition_hint,
            config.small_batch_threshold,
        );

        let id = registry.allocate_id();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let stopped = Arc::new(AtomicBool::new(false));
        let credentials = Arc::new(request.credentials);

        let handle = TaskHandle::new(
            id,
            request.owner,
            request.kind,
            ProgressSnapshot::initial(id, request.kind, total),
            control_tx,
        );
        registry.register(handle.clone())?;

        for (executor_id, slice) in partition_items(request.items, parts).into_iter().enumerate() {
            let executor = PartitionExecutor::new(
                executor_id,
                id,
                slice,
                descriptor,
                chunk_size,
                config.rate_limit_backoff,
                credentials.clone(),
                api.clone(),
                stopped.clone(),
                signal_tx.clone(),
            );
            let failures = signal_tx.clone();
            tokio::spawn(async move {
                if let Err(payload) = AssertUnwindSafe(executor.run()).catch_unwind().await {
                    let _ = failures.send(ExecutorSignal::Failed {
                        executor_id,
                        reason: panic_reason(payload.as_ref()),
                    });
                }
            });
        }
        drop(signal_tx);

        let state = CoordinatorState {
            handle: handle.clone(),
            registry: registry.clone(),
            counters: TaskCounters::new(total),
            errors: HashMap::new(),
            subscribers: SubscriberSet::new(),
            active_executors: (0..parts).collect(),
            stopped,
        };
        tokio::spawn(state.run(control_rx, signal_rx));

        info!(
            task_id = %id,
            kind = %handle.kind(),
            items = total,
            executors = parts,
            "bulk action task started"
        );
        Ok(handle)
    }
}

/// The actor owning all mutable task state.
struct CoordinatorState {
    handle: TaskHandle,
    registry: Arc<TaskRegistry>,
    counters: TaskCounters,
    errors: HashMap<u32, ErrorTally>,
    subscribers: SubscriberSet,
    active_executors: HashSet<usize>,
    stopped: Arc<AtomicBool>,
}

impl CoordinatorState {
    async fn run(
        mut self,
        mut control_rx: mpsc::UnboundedReceiver<ControlMessage>,
        mut signal_rx: mpsc::UnboundedReceiver<ExecutorSignal>,
    ) {
        loop {
            tokio::select! {
                // Control messages win ties so a freshly queued subscriber
                // is attached before any pending executor signal advances
                // the task toward termination
                biased;

                control = control_rx.recv() => match control {
                    Some(ControlMessage::Subscribe { observer_id, observer }) => {
                        observer.deliver(&TaskEvent::Progress {
                            snapshot: self.handle.snapshot(),
                        });
                        self.subscribers.insert(observer_id, observer);
                    }
                    Some(ControlMessage::Unsubscribe { observer_id }) => {
                        self.subscribers.remove(&observer_id);
                    }
                    Some(ControlMessage::Cancel) => {
                        self.stopped.store(true, Ordering::Relaxed);
                        info!(task_id = %self.handle.id(), "task cancelled");
                        self.finish(TaskEvent::TaskCancel {
                            id: self.handle.id(),
                        });
                        return;
                    }
                    // The handle inside self keeps the sender alive, so the
                    // control channel cannot close while the loop runs
                    None => continue,
                },
                signal = signal_rx.recv() => match signal {
                    Some(ExecutorSignal::Progress(delta)) => {
                        self.counters.apply(delta);
                        debug_assert!(self.counters.is_balanced());
                        self.publish_progress();
                    }
                    Some(ExecutorSignal::Errors(histogram)) => {
                        merge_histogram(&mut self.errors, histogram);
                        self.publish_progress();
                    }
                    Some(ExecutorSignal::Finished { executor_id }) => {
                        self.active_executors.remove(&executor_id);
                        debug!(
                            task_id = %self.handle.id(),
                            executor_id,
                            active = self.active_executors.len(),
                            "executor finished"
                        );
                        if self.active_executors.is_empty() {
                            let elapsed_seconds =
                                (Utc::now() - self.handle.started_at()).num_seconds();
                            info!(
                                task_id = %self.handle.id(),
                                done = self.counters.done,
                                failed = self.counters.failed,
                                elapsed_seconds,
                                "task ended"
                            );
                            self.finish(TaskEvent::TaskEnd {
                                id: self.handle.id(),
                                snapshot: self.current_snapshot(),
                                elapsed_seconds,
                            });
                            return;
                        }
                    }
                    Some(ExecutorSignal::Failed { executor_id, reason }) => {
                        error!(
                            task_id = %self.handle.id(),
                            executor_id,
                            reason = %reason,
                            "executor died, tearing task down"
                        );
                        self.stopped.store(true, Ordering::Relaxed);
                        self.finish(TaskEvent::TaskError {
                            id: self.handle.id(),
                            reason,
                        });
                        return;
                    }
                    None => return,
                },
            }
        }
    }

    fn current_snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::project(
            self.handle.id(),
            self.handle.kind(),
            &self.counters,
            &self.errors,
        )
    }

    fn publish_progress(&self) {
        let snapshot = self.current_snapshot();
        self.handle.store_snapshot(snapshot.clone());
        self.subscribers.broadcast(&TaskEvent::Progress { snapshot });
    }

    /// Broadcast the single terminal event and deregister. Called exactly
    /// once per task.
    fn finish(&self, event: TaskEvent) {
        self.handle.store_snapshot(self.current_snapshot());
        self.subscribers.broadcast(&event);
        self.registry.unregister(self.handle.id());
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "executor panicked".to_string()
    }
}
