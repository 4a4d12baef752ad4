//! Shared test doubles for the engine integration suite: a scripted remote
//! API, credential resolvers, and a collecting observer.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use sweeper_core::events::{ProgressObserver, TaskEvent};
use sweeper_core::remote::{
    ApiError, ApiRequest, CredentialResolver, DeletionApi, RemoteCredentials,
};
use tokio::sync::Semaphore;

pub type ApiResult = Result<serde_json::Value, ApiError>;

/// Scripted deletion API.
///
/// Each item id can carry a queue of results (popped per call; an empty or
/// missing queue means success) and an optional gate the call must acquire
/// before answering. Every observed item id is recorded.
#[derive(Default)]
pub struct ScriptedApi {
    responses: Mutex<HashMap<String, Vec<ApiResult>>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, item_id: &str, results: Vec<ApiResult>) {
        self.responses.lock().insert(item_id.to_string(), results);
    }

    /// Block calls for `item_id` until [`ScriptedApi::release`] is called.
    pub fn gate(&self, item_id: &str) {
        self.gates
            .lock()
            .insert(item_id.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, item_id: &str, calls: usize) {
        if let Some(gate) = self.gates.lock().get(item_id) {
            gate.add_permits(calls);
        }
    }

    pub fn calls_for(&self, item_id: &str) -> usize {
        self.seen.lock().iter().filter(|id| *id == item_id).count()
    }

    pub fn total_calls(&self) -> usize {
        self.seen.lock().len()
    }
}

fn item_id_of(request: &ApiRequest) -> String {
    if let Some(suffix) = request.endpoint.strip_prefix("statuses/destroy/") {
        return suffix.to_string();
    }
    for key in ["id", "user_id"] {
        if let Some(value) = request.parameters.get(key).and_then(|v| v.as_str()) {
            return value.to_string();
        }
    }
    request.endpoint.clone()
}

#[async_trait]
impl DeletionApi for ScriptedApi {
    async fn execute(
        &self,
        _credentials: &RemoteCredentials,
        request: &ApiRequest,
    ) -> ApiResult {
        let item_id = item_id_of(request);
        self.seen.lock().push(item_id.clone());

        let gate = self.gates.lock().get(&item_id).cloned();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }

        let mut responses = self.responses.lock();
        match responses.get_mut(&item_id) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => Ok(serde_json::Value::Null),
        }
    }
}

/// Resolver that knows one set of credentials for every owner.
pub struct StaticResolver;

#[async_trait]
impl CredentialResolver for StaticResolver {
    async fn resolve(&self, _user_id: &str) -> Option<RemoteCredentials> {
        Some(RemoteCredentials {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            oauth_token: "ot".to_string(),
            oauth_token_secret: "os".to_string(),
        })
    }
}

/// Resolver that knows nobody.
pub struct EmptyResolver;

#[async_trait]
impl CredentialResolver for EmptyResolver {
    async fn resolve(&self, _user_id: &str) -> Option<RemoteCredentials> {
        None
    }
}

/// Observer that records every delivered event.
#[derive(Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<TaskEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().clone()
    }

    pub fn terminal_events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.is_terminal())
            .cloned()
            .collect()
    }

    pub fn has_terminal(&self) -> bool {
        !self.terminal_events().is_empty()
    }
}

impl ProgressObserver for CollectingObserver {
    fn deliver(&self, event: &TaskEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Poll `condition` until it holds, failing the test after five seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within five seconds"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn owner(user_id: &str) -> sweeper_core::TaskOwner {
    sweeper_core::TaskOwner {
        user_id: user_id.to_string(),
        screen_name: format!("user_{user_id}"),
    }
}
