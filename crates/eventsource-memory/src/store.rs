use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use eventsource_core::context::Context;
use eventsource_core::error::Result;
use eventsource_core::query::{Capabilities, QueryOptions};
use eventsource_core::record::Record;
use eventsource_core::store::{Store, StoreTransaction};
use tokio::sync::RwLock;
use tracing::debug;

use crate::transaction::MemoryTransaction;

const BACKEND: &str = "memory";

pub(crate) type Records = Arc<RwLock<HashMap<String, Vec<Record>>>>;

/// Event store keeping every record in process memory.
///
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Records,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records across all aggregates.
    pub async fn len(&self) -> usize {
        self.records.read().await.values().map(Vec::len).sum()
    }

    /// Returns `true` if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn new_transaction(
        &self,
        ctx: &Context,
        records: Vec<Record>,
    ) -> Result<Box<dyn StoreTransaction>> {
        ctx.check()?;
        Ok(Box::new(MemoryTransaction::new(
            Arc::clone(&self.records),
            records,
        )))
    }

    async fn load_by_aggregate(
        &self,
        ctx: &Context,
        aggregate_id: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Record>> {
        ctx.check()?;
        options.check(Capabilities::ALL, BACKEND)?;

        let records = self.records.read().await;
        let loaded = records
            .get(aggregate_id)
            .map(|history| options.apply(history.iter().cloned()))
            .unwrap_or_default();

        debug!(aggregate_id, count = loaded.len(), "Loaded aggregate records");
        Ok(loaded)
    }

    async fn load(&self, ctx: &Context, options: &QueryOptions) -> Result<Vec<Record>> {
        ctx.check()?;
        options.check(Capabilities::ALL, BACKEND)?;

        let records = self.records.read().await;
        let loaded = options.apply(records.values().flatten().cloned());

        debug!(count = loaded.len(), "Loaded records");
        Ok(loaded)
    }
}
