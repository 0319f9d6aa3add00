use async_trait::async_trait;
use eventsource_core::error::{Error, Result};
use eventsource_core::record::Record;
use eventsource_core::store::StoreTransaction;
use sqlx::Any;
use tokio::sync::Mutex;
use tracing::debug;

enum State {
    Open(sqlx::Transaction<'static, Any>),
    Committed,
    /// The commit was attempted and failed; the database already discarded
    /// the batch.
    Aborted,
    RolledBack,
}

/// A database transaction with every record of the batch inserted but not
/// yet committed.
///
/// Once committed the batch cannot be undone through this handle:
/// `rollback` returns `Error::TransactionClosed`.
pub struct SqlTransaction {
    // Only reached through `&mut self`; the mutex makes the handle `Sync`.
    state: Mutex<State>,
    records: Vec<Record>,
}

impl SqlTransaction {
    pub(crate) fn new(tx: sqlx::Transaction<'static, Any>, records: Vec<Record>) -> Self {
        Self {
            state: Mutex::new(State::Open(tx)),
            records,
        }
    }
}

impl std::fmt::Debug for SqlTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlTransaction")
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreTransaction for SqlTransaction {
    async fn commit(&mut self) -> Result<()> {
        let state = self.state.get_mut();
        let tx = match std::mem::replace(state, State::Aborted) {
            State::Open(tx) => tx,
            previous => {
                *state = previous;
                return Err(Error::TransactionClosed);
            }
        };

        tx.commit().await.map_err(|e| Error::store("commit", e))?;
        *state = State::Committed;
        debug!(count = self.records.len(), "Committed records");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let state = self.state.get_mut();
        match std::mem::replace(state, State::RolledBack) {
            State::Open(tx) => tx.rollback().await.map_err(|e| Error::store("rollback", e)),
            State::Aborted => Ok(()),
            previous @ (State::Committed | State::RolledBack) => {
                *state = previous;
                Err(Error::TransactionClosed)
            }
        }
    }

    fn records(&self) -> &[Record] {
        &self.records
    }
}
