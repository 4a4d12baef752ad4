//! # Engine Configuration
//!
//! Tuning knobs for task partitioning and rate-limit recovery. All defaults
//! come from [`crate::constants`]; tests shrink the backoff and force a tiny
//! chunk size for deterministic runs.

use crate::constants::{DEFAULT_PARTITION_COUNT, RATE_LIMIT_BACKOFF_SECS, SMALL_BATCH_THRESHOLD};
use std::time::Duration;

/// Configuration for the bulk action task engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Requested number of partition executors per task. The effective count
    /// never exceeds the item count and collapses to one for small batches.
    pub partition_count: usize,
    /// Item counts below this threshold always run on a single executor.
    pub small_batch_threshold: usize,
    /// Sleep interval before restarting a rate-limited chunk.
    pub rate_limit_backoff: Duration,
    /// Overrides every catalog chunk size when set. Used for deterministic
    /// small-chunk runs; production leaves this unset.
    pub chunk_size_override: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partition_count: DEFAULT_PARTITION_COUNT,
            small_batch_threshold: SMALL_BATCH_THRESHOLD,
            rate_limit_backoff: Duration::from_secs(RATE_LIMIT_BACKOFF_SECS),
            chunk_size_override: None,
        }
    }
}
