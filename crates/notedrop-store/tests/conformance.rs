//! Cross-backend conformance tests.
//!
//! The same sequence of `create` / `get` / `save` / `delete` / `get_all`
//! calls must yield identical observable results (ids, record contents,
//! error kinds) against every backend. SQLite runs everywhere; the Postgres
//! and Mongo legs need a live server and are gated behind
//! `NOTEDROP_TEST_POSTGRES_URL` / `NOTEDROP_TEST_MONGO_URL`.

use serde_json::json;

use notedrop_store::{MongoStore, PostgresStore, Query, Record, SqliteStore, Store, StoreError};

fn record(value: serde_json::Value) -> Record {
    Record::from_value(value).unwrap()
}

/// Collection name unique to this process run, so server-backed legs start
/// from a clean slate without coordinating cleanup.
fn unique_collection(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("{prefix}_{}_{nanos}", std::process::id())
}

/// The full contract, §-by-§: auto and explicit ids, id validation,
/// save routing, delete checking, targeted and nested queries.
async fn run_conformance_suite(store: &dyn Store) {
    // Auto-generated ids are unique and monotonic, and round-trip the
    // record's fields.
    let first = store
        .create(&record(json!({"name": "first", "nested": {"k": 1}})), true)
        .await
        .unwrap();
    let second = store
        .create(&record(json!({"name": "second"})), true)
        .await
        .unwrap();
    assert!(first > 0);
    assert!(second > first);

    let fetched = store.get(Query::by_id(first), true).await.unwrap().unwrap();
    assert_eq!(fetched.id(), Some(first));
    assert_eq!(fetched.get("name"), Some(&json!("first")));
    assert_eq!(fetched.get("nested"), Some(&json!({"k": 1})));

    // Explicit ids: <= 0 rejected, duplicates rejected.
    let invalid = store.create(&record(json!({"id": 0})), false).await;
    assert!(matches!(invalid, Err(StoreError::InvalidArgument(_))));
    let invalid = store.create(&record(json!({"id": -5})), false).await;
    assert!(matches!(invalid, Err(StoreError::InvalidArgument(_))));

    let explicit = store
        .create(&record(json!({"id": 100, "name": "explicit"})), false)
        .await
        .unwrap();
    assert_eq!(explicit, 100);
    let duplicate = store
        .create(&record(json!({"id": 100, "name": "dup"})), false)
        .await;
    assert!(matches!(
        duplicate,
        Err(StoreError::AlreadyExists { id: 100, .. })
    ));

    // save without id behaves as create(auto); the round-trip reproduces
    // the record's fields plus the assigned id.
    let saved = store
        .save(&record(json!({"name": "via-save"})))
        .await
        .unwrap();
    let fetched = store.get(Query::by_id(saved), true).await.unwrap().unwrap();
    assert_eq!(fetched.get("name"), Some(&json!("via-save")));

    // save against a missing id fails and must not insert.
    let ghost = store.save(&record(json!({"id": 9999, "name": "ghost"}))).await;
    assert!(matches!(ghost, Err(StoreError::NotFound { .. })));
    assert!(store.get(Query::by_id(9999), false).await.unwrap().is_none());

    // save with an existing id updates in place.
    let mut updated = record(json!({"name": "second-edited"}));
    updated.set_id(second);
    assert_eq!(store.save(&updated).await.unwrap(), second);
    let fetched = store.get(Query::by_id(second), true).await.unwrap().unwrap();
    assert_eq!(fetched.get("name"), Some(&json!("second-edited")));

    // Targeted get_all by id returns exactly one record.
    let hits: Vec<Record> = store.get_all(Query::by_id(100)).await.unwrap().collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id(), Some(100));

    // Nested dotted-path query.
    let hits: Vec<Record> = store
        .get_all(Query::new().field("nested.k", 1))
        .await
        .unwrap()
        .collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id(), Some(first));

    // Empty query yields the whole collection.
    let all: Vec<Record> = store.get_all(Query::new()).await.unwrap().collect();
    assert_eq!(all.len(), 4);

    // delete: checked delete of a missing id fails, unchecked succeeds.
    store.delete(second, true).await.unwrap();
    assert!(store.get(Query::by_id(second), false).await.unwrap().is_none());
    let missing = store.delete(second, true).await;
    assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    store.delete(second, false).await.unwrap();

    // get with fail_if_not_exists surfaces NotFound.
    let not_found = store.get(Query::by_id(second), true).await;
    assert!(matches!(not_found, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn sqlite_conformance() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path(), "conformance.db", "conformance")
        .await
        .unwrap();
    run_conformance_suite(&store).await;
    store.close().await.unwrap();
}

#[tokio::test]
async fn postgres_conformance() {
    let Ok(url) = std::env::var("NOTEDROP_TEST_POSTGRES_URL") else {
        eprintln!("NOTEDROP_TEST_POSTGRES_URL not set, skipping");
        return;
    };
    // Unique table per run so ids and contents start from a clean slate.
    let collection = unique_collection("conformance_pg");
    let store = PostgresStore::open(&url, &collection).await.unwrap();
    run_conformance_suite(&store).await;
    store.close().await.unwrap();
}

#[tokio::test]
async fn mongo_conformance() {
    let Ok(url) = std::env::var("NOTEDROP_TEST_MONGO_URL") else {
        eprintln!("NOTEDROP_TEST_MONGO_URL not set, skipping");
        return;
    };
    let collection = unique_collection("conformance");
    let store = MongoStore::open(&url, "notedrop_conformance", &collection)
        .await
        .unwrap();
    run_conformance_suite(&store).await;
    store.close().await.unwrap();
}
