//! # Engine Constants
//!
//! Operational constants for the bulk action task engine: the remote
//! service's well-known error codes and the engine's scheduling defaults.

/// Remote service error code meaning "rate limit exceeded".
///
/// A chunk that observes this code is discarded and restarted after
/// [`RATE_LIMIT_BACKOFF_SECS`].
pub const RATE_LIMIT_ERROR_CODE: u32 = 88;

/// Remote service error code meaning the item no longer exists.
///
/// Normalized to success: there is nothing left to delete.
pub const ITEM_ABSENT_ERROR_CODE: u32 = 144;

/// Pseudo error code under which transport-level failures are folded into
/// the error histogram (the remote service never issues code 0 itself).
pub const TRANSPORT_ERROR_CODE: u32 = 0;

/// Fixed backoff before restarting a rate-limited chunk.
pub const RATE_LIMIT_BACKOFF_SECS: u64 = 300;

/// Item lists shorter than this always run on a single executor; spinning
/// up more is not worth the overhead.
pub const SMALL_BATCH_THRESHOLD: usize = 50;

/// Default number of partition executors per task.
pub const DEFAULT_PARTITION_COUNT: usize = 4;
