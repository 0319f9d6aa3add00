//! Event sourcing core.
//!
//! Events are stored as immutable [`Record`]s keyed by a globally sortable
//! sequence id. The [`Repository`] appends batches atomically through a
//! pluggable [`Store`], fans committed records out to notification services,
//! and rebuilds [`Aggregate`]s by replaying their history. Backends live in
//! their own crates.

pub mod aggregate;
pub mod clock;
pub mod context;
pub mod error;
pub mod event;
pub mod notification;
pub mod query;
pub mod record;
pub mod replay;
pub mod repository;
pub mod sequence;
pub mod serializer;
pub mod store;
pub mod transaction;

pub use aggregate::{Aggregate, Applied};
pub use clock::{Clock, SystemClock};
pub use context::Context;
pub use error::{BoxError, Error, Result};
pub use event::{BaseEvent, Event};
pub use notification::{ChannelNotifier, NotificationService, Recorder};
pub use query::{Capabilities, Filter, Order, QueryOptions};
pub use record::Record;
pub use repository::Repository;
pub use sequence::{SequenceGenerator, new_id};
pub use serializer::{JsonSerializer, Serializer};
pub use store::{Store, StoreTransaction};
pub use transaction::NotifyingTransaction;
