//! Integration tests for `SqlStore` on an in-memory SQLite database.

#![allow(deprecated)]

use std::sync::Arc;

use eventsource_core::{Context, Error, QueryOptions, Record, Repository, Store};
use eventsource_memory::MemoryStore;
use eventsource_sql::{SqlStore, SqlStoreConfig};
use eventsource_test_support::{Account, AccountEvent, account_serializer, init_tracing};

/// One connection, so every query sees the same in-memory database.
async fn sqlite_store() -> SqlStore {
    init_tracing();
    let config = SqlStoreConfig {
        max_connections: 1,
        ..SqlStoreConfig::new("sqlite::memory:")
    };
    let store = SqlStore::connect(&config).await.unwrap();
    store.init().await.unwrap();
    store
}

fn record(aggregate_id: &str, sequence_id: &str, type_name: &str, timestamp: i64) -> Record {
    Record {
        aggregate_id: aggregate_id.into(),
        sequence_id: sequence_id.into(),
        timestamp,
        type_name: type_name.into(),
        data: format!(r#"{{"seq":"{sequence_id}"}}"#).into_bytes(),
        user_id: "tester".into(),
    }
}

fn batch() -> Vec<Record> {
    vec![
        record("A", "01", "TestEventA", 10),
        record("B", "02", "TestEventB", 10),
        record("C", "05", "TestEventA", 40),
        record("D", "04", "TestEventA", 30),
        record("A", "03", "TestEventB", 20),
    ]
}

async fn commit(store: &dyn Store, records: Vec<Record>) {
    let mut tx = store
        .new_transaction(&Context::background(), records)
        .await
        .unwrap();
    tx.commit().await.unwrap();
}

fn sequence_ids(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.sequence_id.as_str()).collect()
}

// --- transactions ---

#[tokio::test]
async fn test_committed_records_round_trip() {
    // Arrange
    let store = sqlite_store().await;
    let expected = record("A", "01", "TestEventA", 1_257_894_000_000_000_000);

    // Act
    commit(&store, vec![expected.clone()]).await;
    let loaded = store
        .load_by_aggregate(&Context::background(), "A", &QueryOptions::new())
        .await
        .unwrap();

    // Assert
    assert_eq!(loaded, vec![expected]);
}

#[tokio::test]
async fn test_rolled_back_batch_is_not_stored() {
    let store = sqlite_store().await;
    let ctx = Context::background();
    let mut tx = store.new_transaction(&ctx, batch()).await.unwrap();

    tx.rollback().await.unwrap();

    let loaded = store.load(&ctx, &QueryOptions::new()).await.unwrap();
    assert!(loaded.is_empty());
}

#[tokio::test]
async fn test_closed_transaction_rejects_further_calls() {
    let store = sqlite_store().await;
    let mut tx = store
        .new_transaction(&Context::background(), batch())
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert!(matches!(tx.commit().await, Err(Error::TransactionClosed)));
    assert!(matches!(tx.rollback().await, Err(Error::TransactionClosed)));
}

#[tokio::test]
async fn test_rolled_back_transaction_rejects_further_calls() {
    let store = sqlite_store().await;
    let ctx = Context::background();
    let mut tx = store.new_transaction(&ctx, batch()).await.unwrap();
    tx.rollback().await.unwrap();

    assert!(matches!(tx.commit().await, Err(Error::TransactionClosed)));
    assert!(matches!(tx.rollback().await, Err(Error::TransactionClosed)));

    let loaded = store.load(&ctx, &QueryOptions::new()).await.unwrap();
    assert!(loaded.is_empty());
}

#[tokio::test]
async fn test_empty_batch_commits() {
    let store = sqlite_store().await;
    let ctx = Context::background();

    let mut tx = store.new_transaction(&ctx, Vec::new()).await.unwrap();
    tx.commit().await.unwrap();

    assert!(store.load(&ctx, &QueryOptions::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_quoted_values_are_stored_verbatim() {
    // Arrange
    let store = sqlite_store().await;
    let mut expected = record("o'brien", "01", "Owner's Event", 7);
    expected.user_id = "x'); DROP TABLE events; --".into();

    // Act
    commit(&store, vec![expected.clone()]).await;
    let loaded = store
        .load_by_aggregate(&Context::background(), "o'brien", &QueryOptions::new())
        .await
        .unwrap();

    // Assert
    assert_eq!(loaded, vec![expected]);
}

#[tokio::test]
async fn test_duplicate_sequence_id_fails_the_whole_batch() {
    // Arrange
    let store = sqlite_store().await;
    let ctx = Context::background();
    commit(&store, vec![record("A", "01", "TestEventA", 1)]).await;

    // Act
    let result = store
        .new_transaction(
            &ctx,
            vec![
                record("B", "02", "TestEventB", 2),
                record("B", "01", "TestEventB", 3),
            ],
        )
        .await;

    // Assert
    assert!(matches!(result, Err(Error::Store { operation: "insert", .. })));
    let loaded = store.load(&ctx, &QueryOptions::new()).await.unwrap();
    assert_eq!(sequence_ids(&loaded), ["01"]);
}

// --- queries ---

#[tokio::test]
async fn test_query_options_match_memory_store() {
    // Arrange
    let sql = sqlite_store().await;
    let memory = MemoryStore::new();
    commit(&sql, batch()).await;
    commit(&memory, batch()).await;
    let ctx = Context::background();
    let cases = [
        QueryOptions::new(),
        QueryOptions::new().by_sequence_id("01"),
        QueryOptions::new().by_sequence_id("01").with_limit(1),
        QueryOptions::new().by_sequence_id("01").by_type("TestEventA"),
        QueryOptions::new().by_timestamp(10),
        QueryOptions::new().descending(),
        QueryOptions::new().descending().with_offset(1).with_limit(2),
        QueryOptions::new().with_offset(3),
        QueryOptions::new().by_type("Nothing"),
    ];

    for options in &cases {
        // Act
        let from_sql = sql.load(&ctx, options).await.unwrap();
        let from_memory = memory.load(&ctx, options).await.unwrap();

        // Assert
        assert_eq!(from_sql, from_memory, "options: {options:?}");
    }

    let aggregate_sql = sql
        .load_by_aggregate(&ctx, "A", &QueryOptions::new().descending())
        .await
        .unwrap();
    let aggregate_memory = memory
        .load_by_aggregate(&ctx, "A", &QueryOptions::new().descending())
        .await
        .unwrap();
    assert_eq!(aggregate_sql, aggregate_memory);
    assert_eq!(sequence_ids(&aggregate_sql), ["03", "01"]);
}

#[tokio::test]
async fn test_deprecated_loaders() {
    let store = sqlite_store().await;
    let ctx = Context::background();
    commit(&store, batch()).await;

    let by_sequence = store
        .load_by_sequence_id(&ctx, "03", &QueryOptions::new())
        .await
        .unwrap();
    let by_sequence_and_type = store
        .load_by_sequence_id_and_type(&ctx, "01", "TestEventB", &QueryOptions::new())
        .await
        .unwrap();
    let by_timestamp = store
        .load_by_timestamp(&ctx, 20, &QueryOptions::new())
        .await
        .unwrap();

    assert_eq!(sequence_ids(&by_sequence), ["04", "05"]);
    assert_eq!(sequence_ids(&by_sequence_and_type), ["02", "03"]);
    assert_eq!(sequence_ids(&by_timestamp), ["04", "05"]);
}

#[tokio::test]
async fn test_cancelled_context_skips_the_query() {
    let store = sqlite_store().await;
    let ctx = Context::background();
    ctx.cancel();

    let result = store.load(&ctx, &QueryOptions::new()).await;

    assert!(matches!(result, Err(Error::Cancelled)));
}

// --- repository on SQL ---

#[tokio::test]
async fn test_repository_save_and_replay() {
    // Arrange
    let store = sqlite_store().await;
    let repository: Repository<AccountEvent> =
        Repository::new(Arc::new(store), Arc::new(account_serializer()));
    let ctx = Context::background();
    let mut events = [
        AccountEvent::opened("acct-1", "alice", "Alice"),
        AccountEvent::deposited("acct-1", "alice", 25),
        AccountEvent::deposited("acct-1", "alice", 17),
    ];

    // Act
    repository.save(&ctx, &mut events).await.unwrap();
    let mut account = Account::default();
    let deleted = repository.load(&ctx, "acct-1", &mut account).await.unwrap();

    // Assert
    assert!(!deleted);
    assert_eq!(account.id, "acct-1");
    assert_eq!(account.owner, "Alice");
    assert_eq!(account.balance, 42);
    assert_eq!(account.applied, events);
}

#[tokio::test]
async fn test_repository_reports_no_history() {
    let store = sqlite_store().await;
    let repository: Repository<AccountEvent> =
        Repository::new(Arc::new(store), Arc::new(account_serializer()));

    let result = repository
        .load(&Context::background(), "missing", &mut Account::default())
        .await;

    assert!(matches!(result, Err(Error::NoHistory)));
}
