//! The event source repository.
//!
//! Turns events into records (assigning sequence ids and timestamps), writes
//! them through a [`Store`] transaction with notification fan-out, and
//! rebuilds aggregates or returns decoded events on the way back.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::aggregate::Aggregate;
use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::notification::NotificationService;
use crate::query::QueryOptions;
use crate::record::Record;
use crate::replay::{Replay, replay};
use crate::sequence::SequenceGenerator;
use crate::serializer::Serializer;
use crate::store::{Store, StoreTransaction};
use crate::transaction::NotifyingTransaction;

/// Event source repository over a store and a serializer.
pub struct Repository<E> {
    store: Arc<dyn Store>,
    serializer: Arc<dyn Serializer<E>>,
    notification_services: Vec<Arc<dyn NotificationService>>,
    sequence: Arc<SequenceGenerator>,
    clock: Arc<dyn Clock>,
}

impl<E: Event> Repository<E> {
    /// Creates a repository using the process-wide sequence generator and
    /// the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, serializer: Arc<dyn Serializer<E>>) -> Self {
        Self {
            store,
            serializer,
            notification_services: Vec::new(),
            sequence: SequenceGenerator::shared(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for record timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the sequence id generator.
    #[must_use]
    pub fn with_sequence_generator(mut self, sequence: Arc<SequenceGenerator>) -> Self {
        self.sequence = sequence;
        self
    }

    /// Registers a sink for committed records. Services are called in
    /// registration order.
    pub fn add_notification_service(&mut self, service: Arc<dyn NotificationService>) {
        self.notification_services.push(service);
    }

    /// The underlying store, for backend-specific operations.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Persists `events` atomically and notifies the registered services.
    ///
    /// Each event gets a fresh sequence id and timestamp written back in
    /// place. If the commit fails the transaction is rolled back.
    ///
    /// # Errors
    ///
    /// - `Error::Commit` if the commit failed and the rollback succeeded.
    /// - `Error::CommitRollback` if both failed.
    /// - `Error::NotificationFailed` if the records are durable but a
    ///   notification service failed. No rollback is attempted.
    /// - Encoding, sequence or store errors from building the transaction.
    #[tracing::instrument(name = "repository.save", skip_all, fields(events = events.len()))]
    pub async fn save(&self, ctx: &Context, events: &mut [E]) -> Result<()> {
        let mut transaction = self.save_transaction(ctx, events).await?;

        match transaction.commit().await {
            Ok(()) => {
                debug!("Saved events");
                Ok(())
            }
            Err(e @ Error::NotificationFailed(_)) => Err(e),
            Err(commit) => {
                warn!(error = %commit, "Commit failed, rolling back");
                match transaction.rollback().await {
                    Ok(()) => Err(Error::Commit(Box::new(commit))),
                    Err(rollback) => {
                        error!(
                            commit_error = %commit,
                            rollback_error = %rollback,
                            "Rollback after failed commit also failed"
                        );
                        Err(Error::CommitRollback {
                            commit: Box::new(commit),
                            rollback: Box::new(rollback),
                        })
                    }
                }
            }
        }
    }

    /// Builds records for `events` and opens a transaction holding them,
    /// without committing.
    ///
    /// Each event gets a fresh sequence id and timestamp written back in
    /// place.
    ///
    /// # Errors
    ///
    /// Returns encoding, sequence, clock or store errors.
    #[tracing::instrument(
        name = "repository.save_transaction",
        skip_all,
        fields(events = events.len())
    )]
    pub async fn save_transaction(
        &self,
        ctx: &Context,
        events: &mut [E],
    ) -> Result<NotifyingTransaction> {
        let records = events
            .iter_mut()
            .map(|event| self.to_record(event))
            .collect::<Result<Vec<_>>>()?;

        let inner = ctx.run(self.store.new_transaction(ctx, records)).await?;

        Ok(NotifyingTransaction::new(
            ctx.clone(),
            inner,
            self.notification_services.clone(),
        ))
    }

    fn to_record(&self, event: &mut E) -> Result<Record> {
        event.set_sequence_id(self.sequence.next_id()?);
        event.set_timestamp(self.clock.now_nanos()?);

        let data = self.serializer.marshal(event)?;

        Ok(Record {
            aggregate_id: event.aggregate_id().to_owned(),
            sequence_id: event.sequence_id().to_owned(),
            timestamp: event.timestamp(),
            type_name: event.type_name().to_owned(),
            data,
            user_id: event.user_id().to_owned(),
        })
    }

    /// Rebuilds `aggregate` from its history.
    ///
    /// Returns `Ok(true)` if replay stopped at a soft delete, `Ok(false)`
    /// once every record was applied.
    ///
    /// # Errors
    ///
    /// - `Error::NoHistory` if the aggregate has no records.
    /// - Store, decode, aggregate and cancellation errors.
    #[tracing::instrument(name = "repository.load", skip_all, fields(aggregate_id = %aggregate_id))]
    pub async fn load<A>(&self, ctx: &Context, aggregate_id: &str, aggregate: &mut A) -> Result<bool>
    where
        A: Aggregate<E> + ?Sized,
    {
        let history = ctx
            .run(
                self.store
                    .load_by_aggregate(ctx, aggregate_id, &QueryOptions::new()),
            )
            .await?;

        if history.is_empty() {
            return Err(Error::NoHistory);
        }

        aggregate.set_aggregate_id(aggregate_id);
        let outcome = replay(ctx, self.serializer.as_ref(), aggregate_id, &history, aggregate)?;

        debug!(records = history.len(), ?outcome, "Replayed aggregate");
        Ok(outcome == Replay::SoftDeleted)
    }

    /// Loads and decodes events matching `options`, across all aggregates.
    ///
    /// # Errors
    ///
    /// Store, decode and cancellation errors.
    #[tracing::instrument(name = "repository.load_events", skip_all)]
    pub async fn load_events(&self, ctx: &Context, options: &QueryOptions) -> Result<Vec<E>> {
        let records = ctx.run(self.store.load(ctx, options)).await?;
        self.decode(ctx, &records)
    }

    /// Events with a sequence id greater than `sequence_id`.
    ///
    /// # Errors
    ///
    /// See [`Repository::load_events`].
    #[deprecated(note = "use `load_events` with `QueryOptions::by_sequence_id`")]
    pub async fn get_events_by_sequence_id(
        &self,
        ctx: &Context,
        sequence_id: &str,
        options: &QueryOptions,
    ) -> Result<Vec<E>> {
        #[allow(deprecated)]
        let records = ctx
            .run(self.store.load_by_sequence_id(ctx, sequence_id, options))
            .await?;
        self.decode(ctx, &records)
    }

    /// Events of the same type as `event` with a sequence id greater than
    /// `sequence_id`.
    ///
    /// # Errors
    ///
    /// See [`Repository::load_events`].
    #[deprecated(note = "use `load_events` with `QueryOptions::by_sequence_id` and `by_type`")]
    pub async fn get_events_by_sequence_id_and_type(
        &self,
        ctx: &Context,
        sequence_id: &str,
        event: &E,
        options: &QueryOptions,
    ) -> Result<Vec<E>> {
        #[allow(deprecated)]
        let records = ctx
            .run(self.store.load_by_sequence_id_and_type(
                ctx,
                sequence_id,
                event.type_name(),
                options,
            ))
            .await?;
        self.decode(ctx, &records)
    }

    /// Events with a timestamp greater than `timestamp`.
    ///
    /// # Errors
    ///
    /// See [`Repository::load_events`].
    #[deprecated(note = "use `load_events` with `QueryOptions::by_timestamp`")]
    pub async fn get_events_by_timestamp(
        &self,
        ctx: &Context,
        timestamp: i64,
        options: &QueryOptions,
    ) -> Result<Vec<E>> {
        #[allow(deprecated)]
        let records = ctx
            .run(self.store.load_by_timestamp(ctx, timestamp, options))
            .await?;
        self.decode(ctx, &records)
    }

    /// Decodes records with this repository's serializer.
    ///
    /// # Errors
    ///
    /// The first decode error.
    pub fn unmarshal_records(&self, records: &[Record]) -> Result<Vec<E>> {
        records
            .iter()
            .map(|record| self.serializer.unmarshal(&record.data, &record.type_name))
            .collect()
    }

    fn decode(&self, ctx: &Context, records: &[Record]) -> Result<Vec<E>> {
        let mut events = Vec::with_capacity(records.len());
        for record in records {
            ctx.check()?;
            match self.serializer.unmarshal(&record.data, &record.type_name) {
                Ok(event) => events.push(event),
                Err(e) => {
                    ctx.check()?;
                    return Err(e);
                }
            }
        }
        Ok(events)
    }
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            serializer: Arc::clone(&self.serializer),
            notification_services: self.notification_services.clone(),
            sequence: Arc::clone(&self.sequence),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<E> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("notification_services", &self.notification_services.len())
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}
