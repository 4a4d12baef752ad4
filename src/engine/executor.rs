//! # Partition Executor
//!
//! Drives one partition of a task's identifier list to completion, chunk by
//! chunk, and is the engine's unit of parallelism.
//!
//! ## Execution model
//!
//! Each chunk fans out one concurrent deletion call per valid item and
//! waits for the whole chunk to settle before advancing, a barrier that
//! bounds simultaneous in-flight calls to the catalog's chunk size. A chunk
//! that observes the rate-limit signal is discarded wholesale:
//! no partial tallies are committed, the executor sleeps the backoff
//! interval, and the same chunk restarts from scratch. Every other per-item
//! failure is absorbed locally; the executor only stops early on
//! cancellation.
//!
//! ## Reporting
//!
//! After each committed chunk the executor sends one `{done, failed}` delta
//! and, when errors occurred, one histogram delta to its coordinator. It
//! never mutates coordinator state directly.

use crate::engine::catalog::ActionDescriptor;
use crate::engine::classifier::{classify, CallOutcome};
use crate::engine::types::{ErrorTally, ProgressDelta, TaskId};
use crate::remote::{DeletionApi, RemoteCredentials};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::constants::TRANSPORT_ERROR_CODE;

/// Message from an executor to its coordinator.
#[derive(Debug)]
pub enum ExecutorSignal {
    /// Counter delta for one committed chunk.
    Progress(ProgressDelta),
    /// Error histogram delta for one committed chunk. Only sent when
    /// non-empty.
    Errors(HashMap<u32, ErrorTally>),
    /// The executor exhausted its partition.
    Finished { executor_id: usize },
    /// The executor died; the coordinator tears the task down.
    Failed { executor_id: usize, reason: String },
}

/// Executes one disjoint, contiguous slice of a task's item list.
///
/// Ephemeral: created at task start, dropped at partition completion or
/// cooperative stop.
pub struct PartitionExecutor {
    executor_id: usize,
    task_id: TaskId,
    items: Vec<String>,
    descriptor: &'static ActionDescriptor,
    chunk_size: usize,
    backoff: Duration,
    credentials: Arc<RemoteCredentials>,
    api: Arc<dyn DeletionApi>,
    stopped: Arc<AtomicBool>,
    signals: mpsc::UnboundedSender<ExecutorSignal>,
    /// Items already granted their one transient-transport retry.
    retried_items: Mutex<HashSet<String>>,
}

impl PartitionExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        executor_id: usize,
        task_id: TaskId,
        items: Vec<String>,
        descriptor: &'static ActionDescriptor,
        chunk_size: usize,
        backoff: Duration,
        credentials: Arc<RemoteCredentials>,
        api: Arc<dyn DeletionApi>,
        stopped: Arc<AtomicBool>,
        signals: mpsc::UnboundedSender<ExecutorSignal>,
    ) -> Self {
        Self {
            executor_id,
            task_id,
            items,
            descriptor,
            chunk_size,
            backoff,
            credentials,
            api,
            stopped,
            signals,
            retried_items: Mutex::new(HashSet::new()),
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Run the partition to completion.
    ///
    /// Returns without further messages when the stop flag is observed;
    /// in-flight calls of the current chunk finish silently and their
    /// results are discarded.
    pub async fn run(self) {
        debug!(
            task_id = %self.task_id,
            executor_id = self.executor_id,
            items = self.items.len(),
            chunk_size = self.chunk_size,
            "partition executor started"
        );

        for chunk in self.items.chunks(self.chunk_size) {
            if self.is_stopped() {
                debug!(
                    task_id = %self.task_id,
                    executor_id = self.executor_id,
                    "stop flag observed, abandoning partition"
                );
                return;
            }

            if !self.run_chunk(chunk).await {
                return;
            }
        }

        debug!(
            task_id = %self.task_id,
            executor_id = self.executor_id,
            "partition exhausted"
        );
        let _ = self.signals.send(ExecutorSignal::Finished {
            executor_id: self.executor_id,
        });
    }

    /// Process one chunk, restarting it after backoff as long as the remote
    /// service keeps rate-limiting. Returns `false` when the stop flag was
    /// observed mid-chunk.
    async fn run_chunk(&self, chunk: &[String]) -> bool {
        loop {
            if self.is_stopped() {
                return false;
            }

            let mut delta = ProgressDelta::default();
            let mut histogram: HashMap<u32, ErrorTally> = HashMap::new();

            let mut calls = Vec::with_capacity(chunk.len());
            for item_id in chunk {
                // Malformed identifiers fail locally, without a remote call
                if item_id.parse::<u64>().is_err() {
                    trace!(
                        task_id = %self.task_id,
                        item_id = %item_id,
                        "malformed item identifier, counting as failed"
                    );
                    delta.failed += 1;
                    continue;
                }
                calls.push(self.delete_item(item_id));
            }

            let outcomes = futures::future::join_all(calls).await;

            if self.descriptor.retry_on_rate_limit
                && outcomes.iter().any(|o| matches!(o, CallOutcome::RateLimited))
            {
                // Discard the whole chunk: no partial tallies are committed
                warn!(
                    task_id = %self.task_id,
                    executor_id = self.executor_id,
                    backoff_secs = self.backoff.as_secs_f64(),
                    "rate limit exceeded, restarting chunk after backoff"
                );
                tokio::time::sleep(self.backoff).await;
                continue;
            }

            for outcome in outcomes {
                match outcome {
                    CallOutcome::Success | CallOutcome::AlreadyAbsent => delta.done += 1,
                    CallOutcome::Failed { code, message } => {
                        delta.failed += 1;
                        record_error(&mut histogram, code, message);
                    }
                    CallOutcome::RateLimited => {
                        // Catalog flag disabled for this kind; surfaced as an
                        // ordinary item failure
                        delta.failed += 1;
                        record_error(
                            &mut histogram,
                            crate::constants::RATE_LIMIT_ERROR_CODE,
                            "rate limit exceeded".to_string(),
                        );
                    }
                    // delete_item resolves transients before returning
                    CallOutcome::TransportTransient { message } => {
                        delta.failed += 1;
                        record_error(&mut histogram, TRANSPORT_ERROR_CODE, message);
                    }
                }
            }

            let _ = self.signals.send(ExecutorSignal::Progress(delta));
            if !histogram.is_empty() {
                let _ = self.signals.send(ExecutorSignal::Errors(histogram));
            }

            return true;
        }
    }

    /// Issue the deletion call for one item, applying the retry-once policy
    /// for transient transport failures.
    async fn delete_item(&self, item_id: &str) -> CallOutcome {
        let request = self.descriptor.build_request(item_id);

        let message = match classify(self.api.execute(&self.credentials, &request).await) {
            CallOutcome::TransportTransient { message } => message,
            other => return other,
        };

        if !self.grant_retry(item_id) {
            // Already retried once in an earlier chunk pass
            return CallOutcome::Failed {
                code: TRANSPORT_ERROR_CODE,
                message,
            };
        }

        debug!(
            task_id = %self.task_id,
            item_id = %item_id,
            "transient transport failure, retrying once"
        );

        match classify(self.api.execute(&self.credentials, &request).await) {
            CallOutcome::TransportTransient { message } => CallOutcome::Failed {
                code: TRANSPORT_ERROR_CODE,
                message,
            },
            other => other,
        }
    }

    /// Record the item as retried. Returns `false` when it had already used
    /// its one retry.
    fn grant_retry(&self, item_id: &str) -> bool {
        self.retried_items.lock().insert(item_id.to_string())
    }
}

fn record_error(histogram: &mut HashMap<u32, ErrorTally>, code: u32, message: String) {
    histogram
        .entry(code)
        .and_modify(|tally| {
            tally.count += 1;
            tally.last_message = message.clone();
        })
        .or_insert(ErrorTally {
            count: 1,
            last_message: message,
        });
}
