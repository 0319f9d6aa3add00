//! Error types shared by the repository, backends and serializers.

use thiserror::Error;

/// Boxed error used at the seams to external collaborators (aggregates,
/// notification transports, serializer internals, database drivers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used across the event sourcing crates.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level event sourcing error type.
#[derive(Debug, Error)]
pub enum Error {
    /// `Repository::load` found no records for the aggregate.
    #[error("no history found")]
    NoHistory,

    /// The batch was committed, but a notification service failed to
    /// receive one of its records. The data is durable.
    #[error("failed to send notification: {0}")]
    NotificationFailed(#[source] BoxError),

    /// The backend could not commit; the rollback that followed succeeded.
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] Box<Error>),

    /// The backend could not commit and the rollback failed as well. The
    /// store may need reconciliation.
    #[error("failed to commit transaction: {commit}; rollback error: {rollback}")]
    CommitRollback {
        /// The commit failure.
        commit: Box<Error>,
        /// The rollback failure that followed it.
        rollback: Box<Error>,
    },

    /// A record payload could not be turned back into an event.
    #[error("failed to unmarshal event of type {type_name}: {source}")]
    Decode {
        /// Type tag of the offending record.
        type_name: String,
        /// Underlying serializer error.
        #[source]
        source: BoxError,
    },

    /// An event could not be serialized into a record payload.
    #[error("failed to marshal event of type {type_name}: {source}")]
    Encode {
        /// Type tag of the offending event.
        type_name: String,
        /// Underlying serializer error.
        #[source]
        source: BoxError,
    },

    /// The serializer has no decoder registered for a type tag.
    #[error("unbound event type: {0}")]
    UnknownEventType(String),

    /// The aggregate rejected an event during replay.
    #[error("aggregate {aggregate_id} failed to apply event: {source}")]
    Aggregate {
        /// The aggregate being replayed.
        aggregate_id: String,
        /// The error returned by the aggregate.
        #[source]
        source: BoxError,
    },

    /// The backend cannot honour a requested query option or operation.
    #[error("{option} is not supported by the {backend} store")]
    Unsupported {
        /// Backend name.
        backend: &'static str,
        /// The option or operation that was requested.
        option: &'static str,
    },

    /// A backend operation failed.
    #[error("store operation {operation} failed: {source}")]
    Store {
        /// Operation name, e.g. `load_by_aggregate`.
        operation: &'static str,
        /// Underlying driver error.
        #[source]
        source: BoxError,
    },

    /// The transaction was already committed or rolled back.
    #[error("transaction already closed")]
    TransactionClosed,

    /// The caller's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The sequence generator ran out of ids for the current millisecond.
    #[error("sequence id space exhausted")]
    SequenceExhausted,

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Wraps a backend error with the name of the failing operation.
    pub fn store(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Store {
            operation,
            source: source.into(),
        }
    }

    /// Returns `true` for the "no history" sentinel.
    #[must_use]
    pub fn is_no_history(&self) -> bool {
        matches!(self, Self::NoHistory)
    }

    /// Returns `true` when the write is durable but notification failed.
    #[must_use]
    pub fn is_notification_failure(&self) -> bool {
        matches!(self, Self::NotificationFailed(_))
    }

    /// Returns `true` when the caller's context ended the operation.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}
