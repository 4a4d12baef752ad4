//! # Bulk Action Service
//!
//! The engine's exposed surface, consumed by an API layer that handles
//! transport, sessions, and authorization. The service validates requests,
//! resolves credentials, and delegates lifecycle work to per-task
//! coordinators; it holds the injected [`TaskRegistry`] and the remote
//! collaborators.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sweeper_core::engine::catalog::ActionKind;
//! use sweeper_core::engine::service::BulkActionService;
//! use sweeper_core::engine::types::TaskOwner;
//! use sweeper_core::remote::{
//!     ApiError, ApiRequest, CredentialResolver, DeletionApi, RemoteCredentials,
//! };
//!
//! struct Api;
//!
//! #[async_trait::async_trait]
//! impl DeletionApi for Api {
//!     async fn execute(
//!         &self,
//!         _credentials: &RemoteCredentials,
//!         _request: &ApiRequest,
//!     ) -> Result<serde_json::Value, ApiError> {
//!         Ok(serde_json::Value::Null)
//!     }
//! }
//!
//! struct Resolver;
//!
//! #[async_trait::async_trait]
//! impl CredentialResolver for Resolver {
//!     async fn resolve(&self, _user_id: &str) -> Option<RemoteCredentials> {
//!         None
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let service = BulkActionService::new(Arc::new(Api), Arc::new(Resolver));
//! let owner = TaskOwner {
//!     user_id: "12".to_string(),
//!     screen_name: "alice".to_string(),
//! };
//!
//! // Creation fails fast: the resolver knows no credentials for this owner
//! let result = service
//!     .create_task(owner, ActionKind::Tweet, vec!["1".to_string()])
//!     .await;
//! assert!(result.is_err());
//! # });
//! ```

use crate::config::EngineConfig;
use crate::engine::catalog::ActionKind;
use crate::engine::coordinator::{TaskCoordinator, TaskRequest};
use crate::engine::registry::TaskRegistry;
use crate::engine::types::{ProgressSnapshot, TaskId, TaskOwner};
use crate::error::{EngineError, EngineResult};
use crate::events::{ObserverId, ProgressObserver};
use crate::remote::{CredentialResolver, DeletionApi};
use std::sync::Arc;
use tracing::{info, instrument};

/// Facade over the task engine.
pub struct BulkActionService {
    registry: Arc<TaskRegistry>,
    api: Arc<dyn DeletionApi>,
    credentials: Arc<dyn CredentialResolver>,
    config: EngineConfig,
}

impl BulkActionService {
    /// Create a service with default configuration.
    pub fn new(api: Arc<dyn DeletionApi>, credentials: Arc<dyn CredentialResolver>) -> Self {
        Self::with_config(api, credentials, EngineConfig::default())
    }

    pub fn with_config(
        api: Arc<dyn DeletionApi>,
        credentials: Arc<dyn CredentialResolver>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry: Arc::new(TaskRegistry::new()),
            api,
            credentials,
            config,
        }
    }

    /// The injected task index, for callers that need direct lookup or
    /// owner-based authorization checks.
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Start a bulk deletion task. Returns once the task is registered and
    /// its executors are spawned; execution proceeds asynchronously.
    ///
    /// Rejects empty item lists and owners without resolvable credentials
    /// before any executor starts.
    #[instrument(skip(self, items), fields(owner = %owner.user_id, kind = %kind, items = items.len()))]
    pub async fn create_task(
        &self,
        owner: TaskOwner,
        kind: ActionKind,
        items: Vec<String>,
    ) -> EngineResult<TaskId> {
        if items.is_empty() {
            return Err(EngineError::EmptyItemList);
        }

        let credentials = self.credentials.resolve(&owner.user_id).await.ok_or_else(|| {
            EngineError::CredentialsNotFound {
                owner_id: owner.user_id.clone(),
            }
        })?;

        let request = TaskRequest {
            owner,
            kind,
            items,
            partition_hint: self.config.partition_count,
            credentials,
        };
        let handle = TaskCoordinator::spawn(request, &self.registry, self.api.clone(), &self.config)?;
        Ok(handle.id())
    }

    /// Current progress of one live task.
    pub fn snapshot(&self, id: TaskId) -> EngineResult<ProgressSnapshot> {
        self.registry
            .get(id)
            .map(|handle| handle.snapshot())
            .ok_or(EngineError::TaskNotFound(id))
    }

    /// Current progress of every live task of one owner, ordered by task id.
    pub fn list_tasks(&self, user_id: &str) -> Vec<ProgressSnapshot> {
        self.registry
            .tasks_of(user_id)
            .into_iter()
            .map(|handle| handle.snapshot())
            .collect()
    }

    /// Cancel one task. Idempotent: cancelling an unknown or already
    /// terminal task is a no-op.
    pub fn cancel_task(&self, id: TaskId) {
        if let Some(handle) = self.registry.get(id) {
            handle.cancel();
        }
    }

    /// Cancel every live task of one owner. Returns the number of tasks a
    /// cancellation was requested for.
    pub fn cancel_all(&self, user_id: &str) -> usize {
        let handles = self.registry.tasks_of(user_id);
        let cancelled = handles.len();
        for handle in handles {
            handle.cancel();
        }
        if cancelled > 0 {
            info!(owner = user_id, cancelled, "cancelled all tasks of owner");
        }
        cancelled
    }

    /// Subscribe an observer to a task's progress. The observer immediately
    /// receives the current snapshot.
    pub fn subscribe(
        &self,
        id: TaskId,
        observer: Arc<dyn ProgressObserver>,
    ) -> EngineResult<ObserverId> {
        self.registry
            .get(id)
            .map(|handle| handle.subscribe(observer))
            .ok_or(EngineError::TaskNotFound(id))
    }

    /// Remove an observer from a task. Never errors: unknown tasks and
    /// unknown observers are no-ops.
    pub fn unsubscribe(&self, id: TaskId, observer_id: ObserverId) {
        if let Some(handle) = self.registry.get(id) {
            handle.unsubscribe(observer_id);
        }
    }
}
