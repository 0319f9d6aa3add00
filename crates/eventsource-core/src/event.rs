//! Domain event abstractions.

use serde::{Deserialize, Serialize};

/// Fields every persisted event carries.
///
/// Concrete event shapes embed this (usually with `#[serde(flatten)]`) and
/// expose it through [`Event::base`]. The sequence id and timestamp start out
/// empty and are written by the repository at save time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEvent {
    /// Aggregate/stream this event belongs to.
    pub aggregate_id: String,
    /// The user that caused the event.
    pub user_id: String,
    /// Sortable sequence id, assigned at persistence time.
    #[serde(default)]
    pub sequence_id: String,
    /// Nanoseconds since the Unix epoch, assigned at persistence time.
    #[serde(default)]
    pub timestamp: i64,
}

impl BaseEvent {
    /// Creates base fields for a new, not yet persisted event.
    #[must_use]
    pub fn new(aggregate_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            aggregate_id: aggregate_id.into(),
            user_id: user_id.into(),
            sequence_id: String::new(),
            timestamp: 0,
        }
    }
}

/// Trait that all domain events implement.
///
/// Only `type_name`, `base` and `base_mut` are required; the accessors are
/// provided on top of the embedded [`BaseEvent`].
pub trait Event: Clone + Send + Sync + std::fmt::Debug {
    /// Type tag stored with the record, used to pick the decoder on load.
    fn type_name(&self) -> &'static str;

    /// The embedded base fields.
    fn base(&self) -> &BaseEvent;

    /// Mutable access to the embedded base fields.
    fn base_mut(&mut self) -> &mut BaseEvent;

    fn aggregate_id(&self) -> &str {
        &self.base().aggregate_id
    }

    fn user_id(&self) -> &str {
        &self.base().user_id
    }

    fn sequence_id(&self) -> &str {
        &self.base().sequence_id
    }

    fn timestamp(&self) -> i64 {
        self.base().timestamp
    }

    fn set_sequence_id(&mut self, sequence_id: String) {
        self.base_mut().sequence_id = sequence_id;
    }

    fn set_timestamp(&mut self, timestamp: i64) {
        self.base_mut().timestamp = timestamp;
    }
}

impl Event for BaseEvent {
    fn type_name(&self) -> &'static str {
        "BaseEvent"
    }

    fn base(&self) -> &BaseEvent {
        self
    }

    fn base_mut(&mut self) -> &mut BaseEvent {
        self
    }
}
