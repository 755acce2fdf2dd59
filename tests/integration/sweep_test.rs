//! Stale-case sweep tests: cases left awaiting acceptance past the grace
//! period are force-closed with an audit message; everything fresher is
//! left alone, and a second run finds nothing.

use chrono::{Duration, Utc};
use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

use fixdesk::backend::cases::sweep::{sweep_stale_cases, SweepOutcome, GRACE_PERIOD_DAYS};
use fixdesk::backend::chat::store;
use fixdesk::shared::cases::{
    NewProcurementRequest, NewTicketRequest, ProcurementStatus, ProcurementStatusRequest,
    SubmitProposalRequest, TicketStatus, TicketStatusRequest,
};
use fixdesk::shared::chat::MessageKind;

use crate::common::database::TestDatabase;
use crate::common::fixtures::{Scenario, TestWorld};

async fn backdate_ticket(pool: &PgPool, id: Uuid, days: i64) {
    sqlx::query("UPDATE tickets SET status_updated_at = $2 WHERE id = $1")
        .bind(id)
        .bind(Utc::now() - Duration::days(days))
        .execute(pool)
        .await
        .expect("backdate ticket");
}

async fn backdate_procurement(pool: &PgPool, id: Uuid, days: i64) {
    sqlx::query("UPDATE procurements SET status_updated_at = $2 WHERE id = $1")
        .bind(id)
        .bind(Utc::now() - Duration::days(days))
        .execute(pool)
        .await
        .expect("backdate procurement");
}

/// Drive a ticket to `resolved` through the normal service path.
async fn resolved_ticket(world: &TestWorld, s: &Scenario, title: &str) -> Uuid {
    let rita = world.profile(s.requester).await;
    let carl = world.profile(s.coordinator).await;
    let ticket = world
        .tickets
        .create(
            &rita,
            NewTicketRequest {
                project_id: s.project,
                recipient_id: s.recipient,
                title: title.to_string(),
                description: "needs acceptance".to_string(),
                priority: None,
                due_date: None,
            },
        )
        .await
        .unwrap();
    for to in [TicketStatus::Open, TicketStatus::Resolved] {
        world
            .tickets
            .update_status(
                &carl,
                ticket.id,
                TicketStatusRequest {
                    status: to,
                    reason: None,
                },
            )
            .await
            .unwrap();
    }
    ticket.id
}

/// Drive a procurement to `workFinished` through the normal service path.
async fn finished_procurement(world: &TestWorld, s: &Scenario) -> Uuid {
    let rita = world.profile(s.requester).await;
    let carl = world.profile(s.coordinator).await;
    let frank = world.profile(s.recipient).await;
    let procurement = world
        .procurements
        .create(
            &rita,
            NewProcurementRequest {
                project_id: s.project,
                recipient_id: s.recipient,
                title: "Loading dock door".to_string(),
                description: "motor replacement".to_string(),
                due_date: None,
            },
        )
        .await
        .unwrap();

    world
        .procurements
        .update_status(
            &carl,
            procurement.id,
            ProcurementStatusRequest {
                status: ProcurementStatus::Open,
                reason: None,
                rating: None,
            },
        )
        .await
        .unwrap();
    world
        .procurements
        .submit_proposal(
            &carl,
            procurement.id,
            SubmitProposalRequest {
                amount_cents: 120_000,
                currency: None,
                file_ref: None,
                cc: Vec::new(),
            },
        )
        .await
        .unwrap();
    world
        .procurements
        .update_status(
            &frank,
            procurement.id,
            ProcurementStatusRequest {
                status: ProcurementStatus::Accepted,
                reason: None,
                rating: None,
            },
        )
        .await
        .unwrap();
    for to in [
        ProcurementStatus::WorkInProgress,
        ProcurementStatus::WorkFinished,
    ] {
        world
            .procurements
            .update_status(
                &carl,
                procurement.id,
                ProcurementStatusRequest {
                    status: to,
                    reason: None,
                    rating: None,
                },
            )
            .await
            .unwrap();
    }
    procurement.id
}

#[tokio::test]
#[serial]
async fn test_sweep_closes_only_overdue_cases() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let stale_ticket = resolved_ticket(&world, &s, "Stale resolved ticket").await;
    let fresh_ticket = resolved_ticket(&world, &s, "Fresh resolved ticket").await;
    let stale_procurement = finished_procurement(&world, &s).await;

    backdate_ticket(db.pool(), stale_ticket, GRACE_PERIOD_DAYS + 1).await;
    backdate_ticket(db.pool(), fresh_ticket, 1).await;
    backdate_procurement(db.pool(), stale_procurement, GRACE_PERIOD_DAYS + 1).await;

    let outcome = sweep_stale_cases(db.pool(), Utc::now()).await.unwrap();
    assert_eq!(
        outcome,
        SweepOutcome {
            tickets_closed: 1,
            procurements_closed: 1,
        }
    );

    let carl = world.profile(s.coordinator).await;
    let closed = world.tickets.get(&carl, stale_ticket).await.unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);

    let untouched = world.tickets.get(&carl, fresh_ticket).await.unwrap();
    assert_eq!(untouched.status, TicketStatus::Resolved);

    let swept = world
        .procurements
        .get(&carl, stale_procurement)
        .await
        .unwrap();
    assert_eq!(swept.status, ProcurementStatus::Closed);

    // The forced close leaves a system audit message on the external chat.
    let mut conn = db.pool().acquire().await.unwrap();
    let (_, messages) =
        store::list_messages(&mut conn, closed.external_conversation_id, None, 50, 0)
            .await
            .unwrap();
    let audit = messages.last().unwrap();
    assert_eq!(audit.kind, MessageKind::SystemTicketClosed);
    assert_eq!(audit.author_id, None);
    assert_eq!(
        audit.metadata["previousStatus"],
        serde_json::json!("resolved")
    );
    assert_eq!(audit.metadata["newStatus"], serde_json::json!("closed"));

    let (_, messages) =
        store::list_messages(&mut conn, swept.external_conversation_id, None, 50, 0)
            .await
            .unwrap();
    assert_eq!(
        messages.last().unwrap().kind,
        MessageKind::SystemProcurementClosed
    );

    // Everything stale is now closed; a second pass is a no-op.
    let outcome = sweep_stale_cases(db.pool(), Utc::now()).await.unwrap();
    assert_eq!(outcome, SweepOutcome::default());
}
