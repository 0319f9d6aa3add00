use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use eventsource_core::error::{Error, Result};
use eventsource_core::record::Record;
use eventsource_core::store::StoreTransaction;
use tracing::debug;

use crate::store::Records;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    RolledBack,
}

/// A batch of records bound for a [`MemoryStore`](crate::MemoryStore).
///
/// The batch is applied under one write lock, so readers see all of it or
/// none of it. Rolling back after a commit removes the batch again.
#[derive(Debug)]
pub struct MemoryTransaction {
    target: Records,
    records: Vec<Record>,
    state: State,
}

impl MemoryTransaction {
    pub(crate) fn new(target: Records, records: Vec<Record>) -> Self {
        Self {
            target,
            records,
            state: State::Open,
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn commit(&mut self) -> Result<()> {
        if self.state != State::Open {
            return Err(Error::TransactionClosed);
        }

        let mut data = self.target.write().await;
        let mut touched = HashSet::new();
        for record in &self.records {
            data.entry(record.aggregate_id.clone())
                .or_default()
                .push(record.clone());
            touched.insert(record.aggregate_id.as_str());
        }
        for aggregate_id in touched {
            if let Some(history) = data.get_mut(aggregate_id) {
                history.sort_by(|a, b| a.sequence_id.cmp(&b.sequence_id));
            }
        }
        drop(data);

        self.state = State::Committed;
        debug!(count = self.records.len(), "Committed records");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        match self.state {
            State::RolledBack => return Err(Error::TransactionClosed),
            State::Open => {}
            State::Committed => {
                let mut data = self.target.write().await;
                for record in &self.records {
                    if let Some(history) = data.get_mut(&record.aggregate_id) {
                        history.retain(|stored| stored.sequence_id != record.sequence_id);
                        if history.is_empty() {
                            data.remove(&record.aggregate_id);
                        }
                    }
                }
                debug!(count = self.records.len(), "Removed committed records");
            }
        }

        self.state = State::RolledBack;
        Ok(())
    }

    fn records(&self) -> &[Record] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use eventsource_core::context::Context;
    use eventsource_core::store::Store;

    use super::*;
    use crate::MemoryStore;

    fn record(aggregate_id: &str, sequence_id: &str) -> Record {
        Record {
            aggregate_id: aggregate_id.into(),
            sequence_id: sequence_id.into(),
            ..Record::default()
        }
    }

    #[tokio::test]
    async fn test_second_commit_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = store
            .new_transaction(&Context::background(), vec![record("A", "1")])
            .await
            .unwrap();

        tx.commit().await.unwrap();
        let second = tx.commit().await;

        assert!(matches!(second, Err(Error::TransactionClosed)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_rollback_of_open_transaction_writes_nothing() {
        // Arrange
        let store = MemoryStore::new();
        let mut tx = store
            .new_transaction(&Context::background(), vec![record("A", "1")])
            .await
            .unwrap();

        // Act
        tx.rollback().await.unwrap();
        let commit = tx.commit().await;

        // Assert
        assert!(matches!(commit, Err(Error::TransactionClosed)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_double_rollback_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = store
            .new_transaction(&Context::background(), vec![record("A", "1")])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        tx.rollback().await.unwrap();
        let second = tx.rollback().await;

        assert!(matches!(second, Err(Error::TransactionClosed)));
    }

    #[tokio::test]
    async fn test_rollback_leaves_other_batches_alone() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let mut first = store
            .new_transaction(&ctx, vec![record("A", "1")])
            .await
            .unwrap();
        let mut second = store
            .new_transaction(&ctx, vec![record("A", "2")])
            .await
            .unwrap();
        first.commit().await.unwrap();
        second.commit().await.unwrap();

        second.rollback().await.unwrap();

        let remaining = store
            .load_by_aggregate(&ctx, "A", &eventsource_core::QueryOptions::new())
            .await
            .unwrap();
        assert_eq!(remaining, vec![record("A", "1")]);
    }
}
