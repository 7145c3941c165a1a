//! Context store behaviour over the in-memory backend

mod helpers;

use std::sync::Arc;
use assert_matches::assert_matches;
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use helpers::*;
use TaskBuddy::models::StateData;
use TaskBuddy::state::{ContextStore, StateBackend, Step};
use TaskBuddy::TaskBuddyError;

const USER: i64 = 100_500;

fn bag(value: Value) -> StateData {
    StateData::from_value(value).unwrap()
}

#[tokio::test]
async fn test_unknown_user_has_no_state() {
    let (store, _) = memory_store().await;

    assert_eq!(store.get_step(USER), None);
    assert!(store.get_data(USER).is_empty());
    assert!(store.state(USER).is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_set_step_on_new_user() {
    let (store, backend) = memory_store().await;

    store.set_step(USER, "s1").await.unwrap();

    assert_eq!(store.get_step(USER).as_deref(), Some("s1"));
    assert!(store.get_data(USER).is_empty());
    assert_eq!(backend.row_count().await, 1);
}

#[tokio::test]
async fn test_set_data_preserves_step() {
    let (store, _) = memory_store().await;

    store.set_step(USER, "s1").await.unwrap();
    store.set_data(USER, bag(json!({"k": "v"}))).await.unwrap();

    assert_eq!(store.get_step(USER).as_deref(), Some("s1"));
    assert_eq!(store.get_data(USER), bag(json!({"k": "v"})));
}

#[tokio::test]
async fn test_set_step_preserves_data() {
    let (store, _) = memory_store().await;

    store.set_data(USER, bag(json!({"k": "v"}))).await.unwrap();
    store.set_step(USER, "s2").await.unwrap();

    assert_eq!(store.get_data(USER), bag(json!({"k": "v"})));
    assert_eq!(store.get_step(USER).as_deref(), Some("s2"));
}

#[tokio::test]
async fn test_clear_keeps_row() {
    let (store, backend) = memory_store().await;

    store.set_step(USER, Step::TasksCreateName).await.unwrap();
    store.set_data(USER, bag(json!({"task_name": "Report"}))).await.unwrap();

    assert!(store.clear(USER).await.unwrap());
    assert_eq!(store.get_step(USER).as_deref(), Some(""));
    assert!(store.get_data(USER).is_empty());
    assert_eq!(backend.row_count().await, 1);

    let version = store.state(USER).unwrap().version;
    store.set_step(USER, Step::MainMenu).await.unwrap();
    assert_eq!(backend.row_count().await, 1);
    assert!(store.state(USER).unwrap().version > version);
    assert!(store.is_at(USER, Step::MainMenu));
}

#[tokio::test]
async fn test_clear_unknown_user_creates_nothing() {
    let (store, backend) = memory_store().await;

    assert!(!store.clear(USER).await.unwrap());
    assert_eq!(backend.row_count().await, 0);
    assert_eq!(store.get_step(USER), None);
}

#[tokio::test]
async fn test_set_data_is_idempotent() {
    let (store, _) = memory_store().await;
    let data = bag(json!({"list_messages_delete_ids": [1, 2], "owner_telegram_id": USER}));

    store.set_data(USER, data.clone()).await.unwrap();
    assert_eq!(store.get_data(USER), data);
    store.set_data(USER, data.clone()).await.unwrap();
    assert_eq!(store.get_data(USER), data);
}

#[tokio::test]
async fn test_update_data() {
    let (store, _) = memory_store().await;
    store.set_data(USER, bag(json!({"a": 1}))).await.unwrap();

    let data = store
        .update_data(USER, |data| {
            data.insert("b", 2).unwrap();
        })
        .await
        .unwrap();

    assert_eq!(data, bag(json!({"a": 1, "b": 2})));
    assert_eq!(store.get_data(USER), data);
}

#[tokio::test]
async fn test_initialize_loads_stored_states() {
    let states = vec![
        stored_state(1, "main_menu", StateData::new().with("owner_telegram_id", 1)),
        stored_state(2, "tasks:view", StateData::new()),
    ];
    let (store, _) = memory_store_with(states).await;

    assert_eq!(store.len(), 2);
    assert_eq!(store.get_step(1).as_deref(), Some("main_menu"));
    assert_eq!(store.get_data(1).get_i64("owner_telegram_id"), Some(1));
    let mut ids = store.user_ids();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_initialize_replaces_cache() {
    let (store, backend) = memory_store().await;
    store.set_step(USER, "s1").await.unwrap();

    // A row written behind the store's back shows up after a reload
    backend.write_step(USER + 1, "s2").await.unwrap();
    assert_eq!(store.get_step(USER + 1), None);

    assert_eq!(store.initialize().await.unwrap(), 2);
    assert_eq!(store.get_step(USER + 1).as_deref(), Some("s2"));
}

#[tokio::test]
async fn test_set_step_after_row_is_recreated() {
    let (store, backend) = memory_store().await;
    for step in ["a", "b", "c"] {
        store.set_step(USER, step).await.unwrap();
    }

    // Another process sharing the storage deletes the row
    let other = ContextStore::open(backend.clone()).await.unwrap();
    assert!(other.remove(USER).await.unwrap());
    assert_eq!(store.get_step(USER).as_deref(), Some("c"));

    store.set_step(USER, Step::MainMenu).await.unwrap();
    assert_eq!(store.get_step(USER).as_deref(), Some("main_menu"));
    assert_eq!(store.state(USER), backend.find(USER).await.unwrap());

    store.set_data(USER, bag(json!({"k": "v"}))).await.unwrap();
    assert_eq!(store.get_data(USER), bag(json!({"k": "v"})));
}

#[tokio::test]
async fn test_remove_then_recreate() {
    let (store, backend) = memory_store().await;
    store.set_step(USER, "s1").await.unwrap();
    store.set_data(USER, bag(json!({"k": "v"}))).await.unwrap();

    assert!(store.remove(USER).await.unwrap());
    assert_eq!(store.get_step(USER), None);
    assert!(store.get_data(USER).is_empty());
    assert_eq!(backend.row_count().await, 0);
    assert!(!store.remove(USER).await.unwrap());

    store.set_data(USER, bag(json!({"n": 1}))).await.unwrap();
    assert_eq!(store.get_step(USER).as_deref(), Some(""));
    assert_eq!(store.get_data(USER), bag(json!({"n": 1})));
}

#[tokio::test]
async fn test_initialize_drops_deleted_rows() {
    let (store, backend) = memory_store().await;
    store.set_step(1, "main_menu").await.unwrap();
    store.set_step(2, "tasks").await.unwrap();

    assert!(backend.delete(2).await.unwrap());
    assert_eq!(store.len(), 2);

    assert_eq!(store.initialize().await.unwrap(), 1);
    assert_eq!(store.user_ids(), vec![1]);
    assert_eq!(store.get_step(1).as_deref(), Some("main_menu"));
    assert_eq!(store.get_step(2), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reload_never_empties_the_store() {
    let states = (1..=50_i64)
        .map(|user_id| stored_state(user_id, "main_menu", StateData::new()))
        .collect();
    let (store, _) = memory_store_with(states).await;

    let reloader = {
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                store.initialize().await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    while !reloader.is_finished() {
        assert_eq!(store.get_step(25).as_deref(), Some("main_menu"));
        tokio::task::yield_now().await;
    }
    reloader.await.unwrap();
    assert_eq!(store.len(), 50);
}

#[tokio::test]
async fn test_failed_writes_leave_cache_untouched() {
    let (store, backend) = memory_store().await;
    store.set_step(USER, "s1").await.unwrap();
    store.set_data(USER, bag(json!({"k": "v"}))).await.unwrap();

    backend.set_offline(true);

    assert_matches!(store.set_step(USER, "s2").await, Err(TaskBuddyError::ServiceUnavailable(_)));
    assert_matches!(store.set_data(USER, StateData::new()).await, Err(TaskBuddyError::ServiceUnavailable(_)));
    assert_matches!(store.clear(USER).await, Err(TaskBuddyError::ServiceUnavailable(_)));

    assert_eq!(store.get_step(USER).as_deref(), Some("s1"));
    assert_eq!(store.get_data(USER), bag(json!({"k": "v"})));

    backend.set_offline(false);
    store.set_step(USER, "s2").await.unwrap();
    assert_eq!(store.get_step(USER).as_deref(), Some("s2"));
}

#[tokio::test]
async fn test_open_fails_when_backend_is_offline() {
    init_tracing();
    let backend = Arc::new(TaskBuddy::state::MemoryStateBackend::new());
    backend.set_offline(true);

    let result = ContextStore::open(backend).await;
    assert_matches!(result, Err(TaskBuddyError::ServiceUnavailable(_)));
}

#[tokio::test]
async fn test_stores_share_nothing() {
    let (first, _) = memory_store().await;
    let (second, _) = memory_store().await;

    first.set_step(USER, "s1").await.unwrap();
    assert_eq!(second.get_step(USER), None);

    // Clones share the cache
    let clone = first.clone();
    assert_eq!(clone.get_step(USER).as_deref(), Some("s1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_for_one_user() {
    let (store, backend) = memory_store().await;
    store.set_step(USER, "start").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16_i64 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                store.set_step(USER, format!("step_{}", i)).await
            } else {
                store.set_data(USER, StateData::new().with("writer", i)).await.map(|_| ())
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Field-level writes: the last step and the last data bag both survive,
    // each one written whole by a single writer
    let cached = store.state(USER).unwrap();
    let stored = backend.find(USER).await.unwrap().unwrap();
    assert_eq!(cached, stored);
    assert_eq!(stored.version, 17);

    let step = stored.step.unwrap();
    assert!(step.starts_with("step_"), "{}", step);
    let writer = stored.data.get_i64("writer").unwrap();
    assert_eq!(writer % 2, 1);
    assert_eq!(stored.data.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_users_are_independent() {
    let (store, _) = memory_store().await;

    let mut handles = Vec::new();
    for user_id in 1..=20_i64 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.set_step(user_id, Step::Tasks).await?;
            store.set_data(user_id, StateData::new().with("owner_telegram_id", user_id)).await?;
            Ok::<_, TaskBuddyError>(())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.len(), 20);
    for user_id in 1..=20_i64 {
        assert!(store.is_at(user_id, "tasks"));
        assert_eq!(store.get_data(user_id).get_i64("owner_telegram_id"), Some(user_id));
    }
}

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 _:.-]{0,16}".prop_map(Value::from),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn data_bag() -> impl Strategy<Value = StateData> {
    prop::collection::btree_map("[a-z_]{1,12}", json_value(), 0..6)
        .prop_map(|m| StateData::from(m.into_iter().collect::<Map<_, _>>()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_data_round_trip(data in data_bag(), step in "[a-z:_]{0,24}") {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let (store, _) = memory_store().await;
            store.set_step(USER, &step).await.unwrap();

            let written = store.set_data(USER, data.clone()).await.unwrap();
            prop_assert_eq!(&written, &data);
            prop_assert_eq!(store.get_data(USER), data);
            prop_assert_eq!(store.get_step(USER), Some(step));
            Ok(())
        })?;
    }
}
