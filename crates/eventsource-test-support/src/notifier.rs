//! Test notification services.

use std::sync::Mutex;

use async_trait::async_trait;
use eventsource_core::context::Context;
use eventsource_core::error::BoxError;
use eventsource_core::notification::NotificationService;
use eventsource_core::record::Record;

/// A notification service that accepts the first `succeed_for` records and
/// fails every send after that with "topic unavailable".
#[derive(Debug)]
pub struct FailingNotifier {
    succeed_for: usize,
    attempts: Mutex<Vec<String>>,
}

impl FailingNotifier {
    /// Accepts `succeed_for` records, then fails.
    #[must_use]
    pub fn after(succeed_for: usize) -> Self {
        Self {
            succeed_for,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Sequence ids of every record a send was attempted for.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationService for FailingNotifier {
    async fn send(&self, _ctx: &Context, record: &Record) -> Result<(), BoxError> {
        let mut attempts = self.attempts.lock().unwrap();
        attempts.push(record.sequence_id.clone());
        if attempts.len() > self.succeed_for {
            return Err("topic unavailable".into());
        }
        Ok(())
    }
}

/// A notification service that never completes. Used to exercise deadlines
/// and cancellation during fan-out.
#[derive(Debug, Default)]
pub struct StalledNotifier;

#[async_trait]
impl NotificationService for StalledNotifier {
    async fn send(&self, _ctx: &Context, _record: &Record) -> Result<(), BoxError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}
