//! Storage backend contract.

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;
use crate::query::QueryOptions;
use crate::record::Record;

/// An uncommitted batch of records.
///
/// Owned by the caller that opened it until it is committed or rolled back.
#[async_trait]
pub trait StoreTransaction: Send + Sync {
    /// Makes every record durable.
    ///
    /// # Errors
    ///
    /// Returns `Error::TransactionClosed` if already committed or rolled
    /// back, or the backend's error.
    async fn commit(&mut self) -> Result<()>;

    /// Undoes any applied records.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, or `Error::TransactionClosed` if the
    /// backend can no longer undo the batch.
    async fn rollback(&mut self) -> Result<()>;

    /// The exact batch this transaction holds, in caller order.
    fn records(&self) -> &[Record];
}

/// Trait implemented by every event store backend.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction holding `records`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the transaction cannot be started.
    async fn new_transaction(
        &self,
        ctx: &Context,
        records: Vec<Record>,
    ) -> Result<Box<dyn StoreTransaction>>;

    /// Loads one aggregate's records, ascending by sequence id unless the
    /// options say otherwise.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, or `Error::Unsupported`.
    async fn load_by_aggregate(
        &self,
        ctx: &Context,
        aggregate_id: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Record>>;

    /// Loads records across all aggregates.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, or `Error::Unsupported`.
    async fn load(&self, ctx: &Context, options: &QueryOptions) -> Result<Vec<Record>>;

    /// Records with a sequence id greater than `sequence_id`.
    ///
    /// # Errors
    ///
    /// See [`Store::load`].
    #[deprecated(note = "use `load` with `QueryOptions::by_sequence_id`")]
    async fn load_by_sequence_id(
        &self,
        ctx: &Context,
        sequence_id: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Record>> {
        let options = options.clone().by_sequence_id(sequence_id);
        self.load(ctx, &options).await
    }

    /// Records of `type_name` with a sequence id greater than `sequence_id`.
    ///
    /// # Errors
    ///
    /// See [`Store::load`].
    #[deprecated(note = "use `load` with `QueryOptions::by_sequence_id` and `by_type`")]
    async fn load_by_sequence_id_and_type(
        &self,
        ctx: &Context,
        sequence_id: &str,
        type_name: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Record>> {
        let options = options
            .clone()
            .by_sequence_id(sequence_id)
            .by_type(type_name);
        self.load(ctx, &options).await
    }

    /// Records with a timestamp greater than `timestamp`.
    ///
    /// # Errors
    ///
    /// See [`Store::load`].
    #[deprecated(note = "use `load` with `QueryOptions::by_timestamp`")]
    async fn load_by_timestamp(
        &self,
        ctx: &Context,
        timestamp: i64,
        options: &QueryOptions,
    ) -> Result<Vec<Record>> {
        let options = options.clone().by_timestamp(timestamp);
        self.load(ctx, &options).await
    }
}
