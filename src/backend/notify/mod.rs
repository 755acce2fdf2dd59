/**
 * Notification Dispatch
 *
 * Case transitions, case creation and proposal submission fan out
 * notifications to the active external-chat participants. Dispatch always
 * happens after the transaction commits, on a spawned task: a slow or
 * failing delivery never delays or fails the write that caused it.
 */

mod pg;

pub use pg::PgNotifier;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::shared::error::CoreResult;
use crate::shared::notification::NotificationKind;

/// Stores a notification and wakes the recipient's devices.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Record one notification for one recipient.
    async fn notify(
        &self,
        actor_id: Uuid,
        recipient_id: Uuid,
        kind: NotificationKind,
        metadata: serde_json::Value,
    ) -> CoreResult<Uuid>;

    /// Ask the push gateway to wake the recipient's devices.
    async fn push(&self, recipient_id: Uuid) -> CoreResult<()>;
}

/// Deliver to every recipient except the actor, on a background task.
///
/// One failing recipient is logged and skipped; the rest still get theirs.
/// Callers invoke this only after their transaction has committed.
pub fn fan_out(
    notifier: Arc<dyn Notifier>,
    actor_id: Uuid,
    recipients: Vec<Uuid>,
    kind: NotificationKind,
    metadata: serde_json::Value,
) {
    tokio::spawn(async move {
        for recipient_id in recipients {
            if recipient_id == actor_id {
                continue;
            }
            match notifier
                .notify(actor_id, recipient_id, kind, metadata.clone())
                .await
            {
                Ok(_) => {
                    if let Err(err) = notifier.push(recipient_id).await {
                        tracing::warn!("Push to {} failed: {}", recipient_id, err);
                    }
                }
                Err(err) => {
                    tracing::warn!("Notification for {} failed: {}", recipient_id, err);
                }
            }
        }
    });
}

/// Test double that records every call and never pushes.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: std::sync::Mutex<Vec<(Uuid, Uuid, NotificationKind)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(actor, recipient, kind)` triples in delivery order.
    pub fn delivered(&self) -> Vec<(Uuid, Uuid, NotificationKind)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        actor_id: Uuid,
        recipient_id: Uuid,
        kind: NotificationKind,
        _metadata: serde_json::Value,
    ) -> CoreResult<Uuid> {
        self.delivered
            .lock()
            .unwrap()
            .push((actor_id, recipient_id, kind));
        Ok(Uuid::new_v4())
    }

    async fn push(&self, _recipient_id: Uuid) -> CoreResult<()> {
        Ok(())
    }
}
