//! # Remote Service Collaborators
//!
//! Trait seams for everything the engine consumes from the outside world:
//! the external deletion API and the credential resolver. The engine never
//! speaks a concrete wire protocol; it hands a [`DeletionApi`]
//! implementation a verb/endpoint/parameters triple and classifies whatever
//! comes back.
//!
//! ## Error shape
//!
//! The remote service answers each call with success, a numeric error code
//! plus message (service-level rejection), or a transport-level failure.
//! Transport failures carry a `transient` flag so the executor can apply its
//! retry-once policy without string-matching on error text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authentication material needed to call the external deletion API on
/// behalf of one owner. Read-only for a task's entire life.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub oauth_token: String,
    pub oauth_token_secret: String,
}

/// HTTP verb of a deletion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Delete,
}

impl std::fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpVerb::Get => write!(f, "GET"),
            HttpVerb::Post => write!(f, "POST"),
            HttpVerb::Delete => write!(f, "DELETE"),
        }
    }
}

/// One fully-shaped deletion call, built by the action catalog for a single
/// item identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub verb: HttpVerb,
    pub endpoint: String,
    pub parameters: serde_json::Value,
}

/// Failure modes of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The service rejected the call with one of its numeric error codes.
    #[error("service error {code}: {message}")]
    Service { code: u32, message: String },

    /// The call never produced a service answer. `transient` marks failures
    /// worth one idempotent retry (connection reset, DNS hiccup).
    #[error("transport error: {message}")]
    Transport { message: String, transient: bool },
}

/// The external deletion API.
///
/// Implementations own connection handling and serialization; the engine
/// only interprets the result. Calls for distinct items are issued
/// concurrently, so implementations must be shareable across tasks.
#[async_trait]
pub trait DeletionApi: Send + Sync {
    async fn execute(
        &self,
        credentials: &RemoteCredentials,
        request: &ApiRequest,
    ) -> Result<serde_json::Value, ApiError>;
}

/// Resolves an owner identity to the credential material needed to call the
/// external API. `None` aborts task creation before any executor starts.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, user_id: &str) -> Option<RemoteCredentials>;
}
