//! End-to-end engine scenarios driven through the service facade with a
//! scripted remote API.

mod common;

use common::{owner, wait_until, CollectingObserver, EmptyResolver, ScriptedApi, StaticResolver};
use std::sync::Arc;
use std::time::Duration;
use sweeper_core::remote::ApiError;
use sweeper_core::{
    ActionKind, BulkActionService, EngineConfig, EngineError, TaskEvent,
};

fn fast_config() -> EngineConfig {
    EngineConfig {
        rate_limit_backoff: Duration::from_millis(20),
        ..EngineConfig::default()
    }
}

fn service_with(api: Arc<ScriptedApi>, config: EngineConfig) -> BulkActionService {
    BulkActionService::with_config(api, Arc::new(StaticResolver), config)
}

fn rate_limit() -> ApiError {
    ApiError::Service {
        code: 88,
        message: "Rate limit exceeded".to_string(),
    }
}

#[tokio::test]
async fn test_end_to_end_rate_limit_then_success() {
    let api = ScriptedApi::new();
    // Item 2 is rate limited once, then succeeds; the others succeed
    // immediately. Chunk size 1 makes the restart deterministic.
    api.script("2", vec![Err(rate_limit()), Ok(serde_json::Value::Null)]);

    let service = service_with(
        api.clone(),
        EngineConfig {
            chunk_size_override: Some(1),
            ..fast_config()
        },
    );
    let observer = CollectingObserver::new();

    let task_id = service
        .create_task(
            owner("12"),
            ActionKind::Tweet,
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
        )
        .await
        .unwrap();
    service.subscribe(task_id, observer.clone()).unwrap();

    wait_until(|| observer.has_terminal()).await;

    let terminals = observer.terminal_events();
    assert_eq!(terminals.len(), 1, "exactly one terminal event");
    let TaskEvent::TaskEnd { snapshot, .. } = &terminals[0] else {
        panic!("expected task-end, got {}", terminals[0].name());
    };

    assert_eq!(snapshot.done, 3);
    assert_eq!(snapshot.failed, 0);
    assert_eq!(snapshot.remaining, 0);
    assert_eq!(snapshot.total, 3);
    assert_eq!(snapshot.percentage, 100.0);

    // Item 2 was called twice (rate limited, then retried after backoff)
    assert_eq!(api.calls_for("2"), 2);

    // The terminal task is no longer registered
    assert_eq!(
        service.snapshot(task_id),
        Err(EngineError::TaskNotFound(task_id))
    );
}

#[tokio::test]
async fn test_malformed_identifier_never_reaches_the_api() {
    let api = ScriptedApi::new();
    let service = service_with(api.clone(), fast_config());
    let observer = CollectingObserver::new();

    let task_id = service
        .create_task(
            owner("12"),
            ActionKind::Tweet,
            vec!["10".to_string(), "not-a-number".to_string(), "11".to_string()],
        )
        .await
        .unwrap();
    service.subscribe(task_id, observer.clone()).unwrap();

    wait_until(|| observer.has_terminal()).await;

    let TaskEvent::TaskEnd { snapshot, .. } = &observer.terminal_events()[0] else {
        panic!("expected task-end");
    };
    assert_eq!(snapshot.done, 2);
    assert_eq!(snapshot.failed, 1);

    assert_eq!(api.calls_for("not-a-number"), 0);
    assert_eq!(api.total_calls(), 2);
}

#[tokio::test]
async fn test_already_absent_item_counts_as_done() {
    let api = ScriptedApi::new();
    api.script(
        "5",
        vec![Err(ApiError::Service {
            code: 144,
            message: "No status found with that ID.".to_string(),
        })],
    );

    let service = service_with(api, fast_config());
    let observer = CollectingObserver::new();

    let task_id = service
        .create_task(owner("12"), ActionKind::Favorite, vec!["5".to_string()])
        .await
        .unwrap();
    service.subscribe(task_id, observer.clone()).unwrap();

    wait_until(|| observer.has_terminal()).await;

    let TaskEvent::TaskEnd { snapshot, .. } = &observer.terminal_events()[0] else {
        panic!("expected task-end");
    };
    assert_eq!(snapshot.done, 1);
    assert_eq!(snapshot.failed, 0);
}

#[tokio::test]
async fn test_no_partial_progress_for_rate_limited_chunk() {
    let api = ScriptedApi::new();
    // Both items of the single chunk rate-limit on the first pass
    api.script("1", vec![Err(rate_limit()), Ok(serde_json::Value::Null)]);
    api.script("2", vec![Err(rate_limit()), Ok(serde_json::Value::Null)]);

    let service = service_with(
        api.clone(),
        EngineConfig {
            chunk_size_override: Some(2),
            ..fast_config()
        },
    );
    let observer = CollectingObserver::new();

    let task_id = service
        .create_task(
            owner("12"),
            ActionKind::Tweet,
            vec!["1".to_string(), "2".to_string()],
        )
        .await
        .unwrap();
    service.subscribe(task_id, observer.clone()).unwrap();

    wait_until(|| observer.has_terminal()).await;

    // No progress snapshot ever shows the discarded pass: counts jump from
    // zero straight to the full chunk
    for event in observer.events() {
        if let TaskEvent::Progress { snapshot } = event {
            let progressed = snapshot.done + snapshot.failed;
            assert!(
                progressed == 0 || progressed == 2,
                "partial delta leaked: {progressed} of 2"
            );
        }
    }

    assert_eq!(api.calls_for("1"), 2);
    assert_eq!(api.calls_for("2"), 2);
}

#[tokio::test]
async fn test_cancel_is_idempotent_with_single_terminal_event() {
    let api = ScriptedApi::new();
    // Gate every item so the task can never finish on its own
    let items: Vec<String> = (0..60).map(|i| i.to_string()).collect();
    for item in &items {
        api.gate(item);
    }

    let service = service_with(api.clone(), fast_config());
    let observer = CollectingObserver::new();

    let task_id = service
        .create_task(owner("12"), ActionKind::Tweet, items.clone())
        .await
        .unwrap();
    service.subscribe(task_id, observer.clone()).unwrap();
    wait_until(|| !observer.events().is_empty()).await;

    service.cancel_task(task_id);
    service.cancel_task(task_id);
    wait_until(|| observer.has_terminal()).await;

    let terminals = observer.terminal_events();
    assert_eq!(terminals.len(), 1, "exactly one terminal event");
    assert!(matches!(terminals[0], TaskEvent::TaskCancel { .. }));

    // Already terminal: a third cancel is a no-op
    service.cancel_task(task_id);
    assert_eq!(observer.terminal_events().len(), 1);
    assert!(service.list_tasks("12").is_empty());

    // Unblock the discarded in-flight calls
    for item in &items {
        api.release(item, 2);
    }
}

#[tokio::test]
async fn test_late_subscriber_receives_current_snapshot_immediately() {
    let api = ScriptedApi::new();
    api.gate("2");

    let service = service_with(
        api.clone(),
        EngineConfig {
            chunk_size_override: Some(1),
            ..fast_config()
        },
    );

    let task_id = service
        .create_task(
            owner("12"),
            ActionKind::Tweet,
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
        )
        .await
        .unwrap();

    // Let the first chunk complete while the second stays blocked
    wait_until(|| {
        service
            .snapshot(task_id)
            .map(|snapshot| snapshot.done == 1)
            .unwrap_or(false)
    })
    .await;

    let late = CollectingObserver::new();
    service.subscribe(task_id, late.clone()).unwrap();
    wait_until(|| !late.events().is_empty()).await;

    // The first delivered event is the current cumulative snapshot, not a
    // fresh one and not the next delta
    let TaskEvent::Progress { snapshot } = &late.events()[0] else {
        panic!("expected an immediate progress event");
    };
    assert_eq!(snapshot.done, 1);
    assert_eq!(snapshot.remaining, 2);

    api.release("2", 1);
    wait_until(|| late.has_terminal()).await;
}

#[tokio::test]
async fn test_cancel_all_cancels_only_that_owner() {
    let api = ScriptedApi::new();
    api.gate("1");

    let service = service_with(api.clone(), fast_config());

    let first = service
        .create_task(owner("100"), ActionKind::Block, vec!["1".to_string()])
        .await
        .unwrap();
    let second = service
        .create_task(owner("100"), ActionKind::Block, vec!["1".to_string()])
        .await
        .unwrap();
    let other = service
        .create_task(owner("200"), ActionKind::Block, vec!["1".to_string()])
        .await
        .unwrap();

    assert_eq!(service.cancel_all("100"), 2);
    wait_until(|| service.list_tasks("100").is_empty()).await;

    assert!(service.snapshot(first).is_err());
    assert!(service.snapshot(second).is_err());
    assert!(service.snapshot(other).is_ok(), "other owner unaffected");

    service.cancel_task(other);
    api.release("1", 4);
}

#[tokio::test]
async fn test_creation_rejections() {
    let api = ScriptedApi::new();

    let service = service_with(api.clone(), fast_config());
    assert_eq!(
        service
            .create_task(owner("12"), ActionKind::Tweet, Vec::new())
            .await,
        Err(EngineError::EmptyItemList)
    );

    let no_credentials = BulkActionService::new(api, Arc::new(EmptyResolver));
    assert_eq!(
        no_credentials
            .create_task(owner("12"), ActionKind::Tweet, vec!["1".to_string()])
            .await,
        Err(EngineError::CredentialsNotFound {
            owner_id: "12".to_string()
        })
    );
    assert_eq!(no_credentials.registry().count(), 0, "nothing registered");
}

#[tokio::test]
async fn test_item_errors_accumulate_in_final_histogram() {
    let api = ScriptedApi::new();
    for item in ["1", "2"] {
        api.script(
            item,
            vec![Err(ApiError::Service {
                code: 179,
                message: "Not authorized.".to_string(),
            })],
        );
    }

    let service = service_with(api, fast_config());
    let observer = CollectingObserver::new();

    let task_id = service
        .create_task(
            owner("12"),
            ActionKind::Tweet,
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
        )
        .await
        .unwrap();
    service.subscribe(task_id, observer.clone()).unwrap();

    wait_until(|| observer.has_terminal()).await;

    let TaskEvent::TaskEnd { snapshot, .. } = &observer.terminal_events()[0] else {
        panic!("expected task-end");
    };
    assert_eq!(snapshot.done, 1);
    assert_eq!(snapshot.failed, 2);
    assert_eq!(snapshot.errors[&179].count, 2);
    assert_eq!(snapshot.errors[&179].last_message, "Not authorized.");
}

#[tokio::test]
async fn test_transient_transport_failure_is_retried_once_through_the_stack() {
    let api = ScriptedApi::new();
    api.script(
        "7",
        vec![
            Err(ApiError::Transport {
                message: "connection reset".to_string(),
                transient: true,
            }),
            Ok(serde_json::Value::Null),
        ],
    );

    let service = service_with(api.clone(), fast_config());
    let observer = CollectingObserver::new();

    let task_id = service
        .create_task(owner("12"), ActionKind::Tweet, vec!["7".to_string()])
        .await
        .unwrap();
    service.subscribe(task_id, observer.clone()).unwrap();

    wait_until(|| observer.has_terminal()).await;

    let TaskEvent::TaskEnd { snapshot, .. } = &observer.terminal_events()[0] else {
        panic!("expected task-end");
    };
    assert_eq!(snapshot.done, 1);
    assert_eq!(snapshot.failed, 0);
    assert_eq!(api.calls_for("7"), 2);
}

#[tokio::test]
async fn test_snapshot_of_unknown_task() {
    let service = service_with(ScriptedApi::new(), fast_config());
    let bogus = sweeper_core::TaskId(424242);

    assert_eq!(service.snapshot(bogus), Err(EngineError::TaskNotFound(bogus)));
    assert!(service.list_tasks("nobody").is_empty());
}
