//! # Action Catalog
//!
//! Static mapping from an action kind to its call shape: HTTP verb, per-item
//! request builder, chunk size, and whether the rate-limit chunk restart
//! applies. Pure lookup, no mutable state.
//!
//! Chunk sizes bound the number of simultaneous in-flight calls per
//! partition: 100 for tweets and direct messages, 75 for the user-relation
//! kinds (mute, block, favorite).

use crate::error::EngineError;
use crate::remote::{ApiRequest, HttpVerb};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;

/// Which deletion operation a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Tweet,
    Mute,
    Block,
    Favorite,
    DirectMessage,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Tweet,
        ActionKind::Mute,
        ActionKind::Block,
        ActionKind::Favorite,
        ActionKind::DirectMessage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Tweet => "tweet",
            ActionKind::Mute => "mute",
            ActionKind::Block => "block",
            ActionKind::Favorite => "favorite",
            ActionKind::DirectMessage => "direct-message",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = EngineError;

    /// Parse a wire kind name. The short aliases `fav` and `dm` are accepted
    /// for compatibility with older callers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tweet" => Ok(ActionKind::Tweet),
            "mute" => Ok(ActionKind::Mute),
            "block" => Ok(ActionKind::Block),
            "favorite" | "fav" => Ok(ActionKind::Favorite),
            "direct-message" | "dm" => Ok(ActionKind::DirectMessage),
            other => Err(EngineError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Immutable call shape for one action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    pub verb: HttpVerb,
    /// Max concurrent in-flight requests per chunk.
    pub chunk_size: usize,
    /// Whether a rate-limited chunk is restarted after backoff.
    pub retry_on_rate_limit: bool,
}

static CATALOG: [ActionDescriptor; 5] = [
    ActionDescriptor {
        kind: ActionKind::Tweet,
        verb: HttpVerb::Post,
        chunk_size: 100,
        retry_on_rate_limit: true,
    },
    ActionDescriptor {
        kind: ActionKind::Mute,
        verb: HttpVerb::Post,
        chunk_size: 75,
        retry_on_rate_limit: true,
    },
    ActionDescriptor {
        kind: ActionKind::Block,
        verb: HttpVerb::Post,
        chunk_size: 75,
        retry_on_rate_limit: true,
    },
    ActionDescriptor {
        kind: ActionKind::Favorite,
        verb: HttpVerb::Post,
        chunk_size: 75,
        retry_on_rate_limit: true,
    },
    ActionDescriptor {
        kind: ActionKind::DirectMessage,
        verb: HttpVerb::Delete,
        chunk_size: 100,
        retry_on_rate_limit: true,
    },
];

impl ActionDescriptor {
    /// Look up the descriptor for a kind. Total: every `ActionKind` has an
    /// entry, so kind validation lives at the string boundary
    /// ([`ActionKind::from_str`]).
    pub fn resolve(kind: ActionKind) -> &'static ActionDescriptor {
        match kind {
            ActionKind::Tweet => &CATALOG[0],
            ActionKind::Mute => &CATALOG[1],
            ActionKind::Block => &CATALOG[2],
            ActionKind::Favorite => &CATALOG[3],
            ActionKind::DirectMessage => &CATALOG[4],
        }
    }

    /// Build the deletion request for one item identifier.
    pub fn build_request(&self, item_id: &str) -> ApiRequest {
        let (endpoint, parameters) = match self.kind {
            ActionKind::Tweet => (
                format!("statuses/destroy/{item_id}"),
                json!({ "trim_user": true }),
            ),
            ActionKind::Mute => (
                "mutes/users/destroy".to_string(),
                json!({ "user_id": item_id, "skip_status": true, "include_entities": false }),
            ),
            ActionKind::Block => (
                "blocks/destroy".to_string(),
                json!({ "user_id": item_id, "include_entities": false, "skip_status": true }),
            ),
            ActionKind::Favorite => (
                "favorites/destroy".to_string(),
                json!({ "id": item_id, "include_entities": false }),
            ),
            ActionKind::DirectMessage => (
                "direct_messages/events/destroy".to_string(),
                json!({ "id": item_id }),
            ),
        };

        ApiRequest {
            verb: self.verb,
            endpoint,
            parameters,
        }
    }
}
