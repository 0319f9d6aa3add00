//! Mock `Store` implementations for error paths.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eventsource_core::context::Context;
use eventsource_core::error::{Error, Result};
use eventsource_core::query::QueryOptions;
use eventsource_core::record::Record;
use eventsource_core::store::{Store, StoreTransaction};

/// Calls observed by a [`ScriptedStore`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    NewTransaction(usize),
    Commit,
    Rollback,
}

/// A store whose transactions fail on demand. Loads always return nothing.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStore {
    fail_begin: bool,
    fail_commit: bool,
    fail_rollback: bool,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedStore {
    /// A store whose transactions succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `new_transaction` fails with "connection refused".
    #[must_use]
    pub fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    /// `commit` fails with "disk full".
    #[must_use]
    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// `rollback` fails with "connection reset".
    #[must_use]
    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    /// Snapshot of all calls made so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Store for ScriptedStore {
    async fn new_transaction(
        &self,
        _ctx: &Context,
        records: Vec<Record>,
    ) -> Result<Box<dyn StoreTransaction>> {
        self.record(Call::NewTransaction(records.len()));
        if self.fail_begin {
            return Err(Error::store("new_transaction", "connection refused"));
        }
        Ok(Box::new(ScriptedTransaction {
            store: self.clone(),
            records,
        }))
    }

    async fn load_by_aggregate(
        &self,
        _ctx: &Context,
        _aggregate_id: &str,
        _options: &QueryOptions,
    ) -> Result<Vec<Record>> {
        Ok(Vec::new())
    }

    async fn load(&self, _ctx: &Context, _options: &QueryOptions) -> Result<Vec<Record>> {
        Ok(Vec::new())
    }
}

#[derive(Debug)]
struct ScriptedTransaction {
    store: ScriptedStore,
    records: Vec<Record>,
}

#[async_trait]
impl StoreTransaction for ScriptedTransaction {
    async fn commit(&mut self) -> Result<()> {
        self.store.record(Call::Commit);
        if self.store.fail_commit {
            return Err(Error::store("commit", "disk full"));
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.store.record(Call::Rollback);
        if self.store.fail_rollback {
            return Err(Error::store("rollback", "connection reset"));
        }
        Ok(())
    }

    fn records(&self) -> &[Record] {
        &self.records
    }
}

/// A store whose every operation fails with "connection refused".
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

#[async_trait]
impl Store for FailingStore {
    async fn new_transaction(
        &self,
        _ctx: &Context,
        _records: Vec<Record>,
    ) -> Result<Box<dyn StoreTransaction>> {
        Err(Error::store("new_transaction", "connection refused"))
    }

    async fn load_by_aggregate(
        &self,
        _ctx: &Context,
        _aggregate_id: &str,
        _options: &QueryOptions,
    ) -> Result<Vec<Record>> {
        Err(Error::store("load_by_aggregate", "connection refused"))
    }

    async fn load(&self, _ctx: &Context, _options: &QueryOptions) -> Result<Vec<Record>> {
        Err(Error::store("load", "connection refused"))
    }
}
