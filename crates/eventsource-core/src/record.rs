//! Stored representation of a domain event.

use serde::{Deserialize, Serialize};

/// Backend-neutral row for one persisted event.
///
/// Records are immutable once written; a backend only removes them when the
/// transaction that wrote them is rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Aggregate this event belongs to.
    pub aggregate_id: String,
    /// Sortable sequence id assigned at save time.
    pub sequence_id: String,
    /// Nanoseconds since the Unix epoch, assigned at save time.
    pub timestamp: i64,
    /// Event type name for deserialization routing.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Serialized event payload.
    pub data: Vec<u8>,
    /// The user that caused the event.
    pub user_id: String,
}
