//! # Call Outcome Classification
//!
//! Maps every remote call result onto a closed set of outcomes so executor
//! logic pattern-matches instead of probing response shapes. The mapping is
//! pure; policy (chunk restart, retry-once) stays in the executor.

use crate::constants::{ITEM_ABSENT_ERROR_CODE, RATE_LIMIT_ERROR_CODE, TRANSPORT_ERROR_CODE};
use crate::remote::ApiError;

/// Classified outcome of one deletion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The service deleted the item.
    Success,
    /// The item no longer exists; nothing to delete. Counted as done.
    AlreadyAbsent,
    /// The service's rate-limit signal. Triggers a whole-chunk restart when
    /// the catalog allows it; never surfaced as a task failure in that case.
    RateLimited,
    /// Transport-level failure worth one idempotent retry.
    TransportTransient { message: String },
    /// Any other failure; recorded in the histogram, counted as failed.
    Failed { code: u32, message: String },
}

/// Classify a single call result.
pub fn classify(result: Result<serde_json::Value, ApiError>) -> CallOutcome {
    match result {
        Ok(_) => CallOutcome::Success,
        Err(ApiError::Service { code, .. }) if code == RATE_LIMIT_ERROR_CODE => {
            CallOutcome::RateLimited
        }
        Err(ApiError::Service { code, .. }) if code == ITEM_ABSENT_ERROR_CODE => {
            CallOutcome::AlreadyAbsent
        }
        Err(ApiError::Service { code, message }) => CallOutcome::Failed { code, message },
        Err(ApiError::Transport {
            message,
            transient: true,
        }) => CallOutcome::TransportTransient { message },
        Err(ApiError::Transport {
            message,
            transient: false,
        }) => CallOutcome::Failed {
            code: TRANSPORT_ERROR_CODE,
            message,
        },
    }
}
