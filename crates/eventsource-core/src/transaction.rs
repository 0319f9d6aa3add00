//! Store transaction decorated with post-commit notification.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::notification::NotificationService;
use crate::record::Record;
use crate::store::StoreTransaction;

/// Wraps a backend transaction; a successful commit is followed by sending
/// every record to every notification service.
///
/// If a send fails, `commit` returns `Error::NotificationFailed`. The batch
/// is already durable at that point: retry the notification, not the write.
pub struct NotifyingTransaction {
    ctx: Context,
    inner: Box<dyn StoreTransaction>,
    services: Vec<Arc<dyn NotificationService>>,
}

impl NotifyingTransaction {
    #[must_use]
    pub fn new(
        ctx: Context,
        inner: Box<dyn StoreTransaction>,
        services: Vec<Arc<dyn NotificationService>>,
    ) -> Self {
        Self {
            ctx,
            inner,
            services,
        }
    }

    async fn notify(&self) -> Result<()> {
        for service in &self.services {
            for record in self.inner.records() {
                let sent = self
                    .ctx
                    .run(async {
                        service
                            .send(&self.ctx, record)
                            .await
                            .map_err(Error::NotificationFailed)
                    })
                    .await;

                if let Err(e) = sent {
                    warn!(
                        aggregate_id = %record.aggregate_id,
                        sequence_id = %record.sequence_id,
                        error = %e,
                        "Notification failed after commit"
                    );
                    return Err(match e {
                        Error::NotificationFailed(_) => e,
                        other => Error::NotificationFailed(Box::new(other)),
                    });
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for NotifyingTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyingTransaction")
            .field("records", &self.inner.records().len())
            .field("services", &self.services.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreTransaction for NotifyingTransaction {
    async fn commit(&mut self) -> Result<()> {
        self.inner.commit().await?;
        self.notify().await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.inner.rollback().await
    }

    fn records(&self) -> &[Record] {
        self.inner.records()
    }
}
