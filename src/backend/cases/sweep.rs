//! Stale-case sweep
//!
//! Cases left in their awaiting-acceptance status (ticket `resolved`,
//! procurement `workFinished`) past a grace period are force-closed with a
//! system message. The close is a conditional row update, so a sweep racing
//! a user transition simply affects zero rows and moves on. The scheduler
//! that invokes this lives in the server layer.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::backend::chat::store as chat_store;
use crate::backend::uow;
use crate::shared::cases::{ProcurementStatus, TicketStatus};
use crate::shared::chat::MessageKind;
use crate::shared::error::{CoreError, CoreResult};

use super::store;

/// How long a case may await acceptance before the sweep closes it.
pub const GRACE_PERIOD_DAYS: i64 = 3;

/// What one sweep run actually closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub tickets_closed: usize,
    pub procurements_closed: usize,
}

/// Close every case that has sat in awaiting-acceptance longer than the
/// grace period. One failed case is logged and skipped, never aborting the
/// rest of the run.
pub async fn sweep_stale_cases(pool: &PgPool, now: DateTime<Utc>) -> CoreResult<SweepOutcome> {
    let cutoff = now - Duration::days(GRACE_PERIOD_DAYS);
    let mut outcome = SweepOutcome::default();

    let mut conn = pool.acquire().await.map_err(CoreError::from)?;
    let ticket_ids = store::stale_resolved_tickets(&mut conn, cutoff).await?;
    let procurement_ids = store::stale_finished_procurements(&mut conn, cutoff).await?;
    drop(conn);

    for id in ticket_ids {
        match close_ticket(pool, id, cutoff, now).await {
            Ok(true) => outcome.tickets_closed += 1,
            // A user transition won the race between SELECT and UPDATE.
            Ok(false) => {}
            Err(err) => {
                tracing::warn!("Sweep failed to close ticket {}: {}", id, err);
            }
        }
    }

    for id in procurement_ids {
        match close_procurement(pool, id, cutoff, now).await {
            Ok(true) => outcome.procurements_closed += 1,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!("Sweep failed to close procurement {}: {}", id, err);
            }
        }
    }

    if outcome.tickets_closed > 0 || outcome.procurements_closed > 0 {
        tracing::info!(
            "Sweep closed {} stale ticket(s) and {} stale procurement(s)",
            outcome.tickets_closed,
            outcome.procurements_closed
        );
    }

    Ok(outcome)
}

/// Close one stale ticket and post its audit message atomically. `false`
/// means the conditional update matched nothing.
async fn close_ticket(
    pool: &PgPool,
    id: Uuid,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CoreResult<bool> {
    uow::run(pool, move |tx| {
        Box::pin(async move {
            let Some(ticket) = store::close_stale_ticket(&mut **tx, id, cutoff, now).await? else {
                return Ok(false);
            };

            chat_store::post_message(
                &mut **tx,
                ticket.external_conversation_id,
                None,
                MessageKind::SystemTicketClosed,
                "",
                &[],
                serde_json::json!({
                    "ticketId": ticket.id,
                    "previousStatus": TicketStatus::Resolved,
                    "newStatus": TicketStatus::Closed,
                }),
            )
            .await?;

            Ok(true)
        })
    })
    .await
}

async fn close_procurement(
    pool: &PgPool,
    id: Uuid,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CoreResult<bool> {
    uow::run(pool, move |tx| {
        Box::pin(async move {
            let Some(procurement) =
                store::close_stale_procurement(&mut **tx, id, cutoff, now).await?
            else {
                return Ok(false);
            };

            chat_store::post_message(
                &mut **tx,
                procurement.external_conversation_id,
                None,
                MessageKind::SystemProcurementClosed,
                "",
                &[],
                serde_json::json!({
                    "procurementId": procurement.id,
                    "previousStatus": ProcurementStatus::WorkFinished,
                    "newStatus": ProcurementStatus::Closed,
                }),
            )
            .await?;

            Ok(true)
        })
    })
    .await
}
