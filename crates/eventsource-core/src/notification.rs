//! Post-commit notification services.
//!
//! A repository fans every committed record out to each registered
//! [`NotificationService`]. Delivery is at-least-once from the caller's point
//! of view: a failed send surfaces as `Error::NotificationFailed` after the
//! data is already durable.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::context::Context;
use crate::error::BoxError;
use crate::record::Record;

/// Channel capacity used by [`ChannelNotifier::default`].
const CHANNEL_CAPACITY: usize = 1024;

/// A sink for committed records.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Delivers one committed record.
    ///
    /// # Errors
    ///
    /// Any transport error; the repository reports it as
    /// `Error::NotificationFailed`.
    async fn send(&self, ctx: &Context, record: &Record) -> Result<(), BoxError>;
}

/// Keeps every record it is sent. Useful in tests and local tooling.
#[derive(Debug, Default)]
pub struct Recorder {
    records: Mutex<Vec<Record>>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records received so far, in delivery order.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The received payloads decoded as JSON objects.
    ///
    /// # Errors
    ///
    /// Fails if a payload is not a JSON object.
    pub fn payloads(&self) -> serde_json::Result<Vec<serde_json::Map<String, serde_json::Value>>> {
        self.records()
            .iter()
            .map(|record| serde_json::from_slice(&record.data))
            .collect()
    }
}

#[async_trait]
impl NotificationService for Recorder {
    async fn send(&self, _ctx: &Context, record: &Record) -> Result<(), BoxError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

/// Publishes committed records on an in-process broadcast channel.
///
/// Having no subscribers is not an error; records sent while nobody listens
/// are dropped.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: broadcast::Sender<Arc<Record>>,
}

impl ChannelNotifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// A new receiver seeing every record published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Record>> {
        self.sender.subscribe()
    }
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl NotificationService for ChannelNotifier {
    async fn send(&self, _ctx: &Context, record: &Record) -> Result<(), BoxError> {
        match self.sender.send(Arc::new(record.clone())) {
            Ok(receivers) => {
                debug!(
                    aggregate_id = %record.aggregate_id,
                    sequence_id = %record.sequence_id,
                    receivers,
                    "Published record to channel"
                );
            }
            Err(_) => {
                debug!(sequence_id = %record.sequence_id, "Published record (no receivers)");
            }
        }
        Ok(())
    }
}
