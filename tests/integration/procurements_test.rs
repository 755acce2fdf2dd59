//! Procurement lifecycle tests: proposal submission and cancellation,
//! quiet transitions, and the work review path.

use assert_matches::assert_matches;
use serial_test::serial;

use fixdesk::backend::chat::store;
use fixdesk::shared::cases::{
    NewProcurementRequest, Procurement, ProcurementStatus, ProcurementStatusRequest,
    SubmitProposalRequest, WorkReviewRequest, DEFAULT_PROPOSAL_CURRENCY,
};
use fixdesk::shared::chat::MessageKind;
use fixdesk::shared::error::{codes, CoreError};
use fixdesk::shared::notification::NotificationKind;

use crate::common::database::TestDatabase;
use crate::common::fixtures::{Scenario, TestWorld};

async fn open_procurement(world: &TestWorld, s: &Scenario) -> Procurement {
    let rita = world.profile(s.requester).await;
    world
        .procurements
        .create(
            &rita,
            NewProcurementRequest {
                project_id: s.project,
                recipient_id: s.recipient,
                title: "Replacement chiller unit".to_string(),
                description: "Rooftop chiller is past end of life".to_string(),
                due_date: None,
            },
        )
        .await
        .expect("create procurement")
}

fn status(to: ProcurementStatus) -> ProcurementStatusRequest {
    ProcurementStatusRequest {
        status: to,
        reason: None,
        rating: None,
    }
}

async fn external_total(db: &TestDatabase, procurement: &Procurement) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    let (total, _) = store::list_messages(
        &mut conn,
        procurement.external_conversation_id,
        None,
        50,
        0,
    )
    .await
    .unwrap();
    total
}

#[tokio::test]
#[serial]
async fn test_create_starts_with_empty_proposal() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let procurement = open_procurement(&world, &s).await;
    assert_eq!(procurement.status, ProcurementStatus::New);
    assert_eq!(procurement.proposal_amount_cents, 0);
    assert_eq!(procurement.proposal_currency, DEFAULT_PROPOSAL_CURRENCY);
    assert_eq!(procurement.proposal_file_ref, None);
    assert!(!procurement.has_proposal());

    let mut conn = db.pool().acquire().await.unwrap();
    let (total, messages) = store::list_messages(
        &mut conn,
        procurement.external_conversation_id,
        None,
        50,
        0,
    )
    .await
    .unwrap();
    assert_eq!(total, 1);
    assert_eq!(messages[0].kind, MessageKind::UserNewProcurement);
    assert_eq!(messages[0].body, "Rooftop chiller is past end of life");

    world.settle().await;
    assert!(world
        .notifier
        .delivered()
        .iter()
        .any(|(_, recipient, kind)| *recipient == s.recipient
            && *kind == NotificationKind::CaseOpened));
}

#[tokio::test]
#[serial]
async fn test_proposal_submission_flow() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let procurement = open_procurement(&world, &s).await;
    let carl = world.profile(s.coordinator).await;

    // Not submittable while the case is still new.
    let err = world
        .procurements
        .submit_proposal(
            &carl,
            procurement.id,
            SubmitProposalRequest {
                amount_cents: 250_000,
                currency: None,
                file_ref: None,
                cc: Vec::new(),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(
        err,
        CoreError::InvalidTransition { code, .. } if code == codes::PROPOSAL_NOT_OPEN
    );

    world
        .procurements
        .update_status(&carl, procurement.id, status(ProcurementStatus::Open))
        .await
        .unwrap();

    let updated = world
        .procurements
        .submit_proposal(
            &carl,
            procurement.id,
            SubmitProposalRequest {
                amount_cents: 250_000,
                currency: None,
                file_ref: Some("blob:quote-17".to_string()),
                cc: vec!["purchasing@example.com".to_string()],
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, ProcurementStatus::ProposalSubmitted);
    assert_eq!(updated.proposal_amount_cents, 250_000);
    assert_eq!(updated.proposal_currency, DEFAULT_PROPOSAL_CURRENCY);
    assert_eq!(updated.proposal_file_ref.as_deref(), Some("blob:quote-17"));
    assert!(updated.has_proposal());

    let mut conn = db.pool().acquire().await.unwrap();
    let (_, messages) = store::list_messages(
        &mut conn,
        procurement.external_conversation_id,
        None,
        50,
        0,
    )
    .await
    .unwrap();
    let submitted = messages.last().unwrap();
    assert_eq!(submitted.kind, MessageKind::ProposalSubmitted);
    assert_eq!(submitted.metadata["amountCents"], serde_json::json!(250_000));

    world.settle().await;
    assert!(world
        .notifier
        .delivered()
        .iter()
        .any(|(actor, recipient, kind)| *actor == s.coordinator
            && *recipient == s.recipient
            && *kind == NotificationKind::ProposalSubmitted));
}

#[tokio::test]
#[serial]
async fn test_proposal_cancellation_resets_fields() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let procurement = open_procurement(&world, &s).await;
    let carl = world.profile(s.coordinator).await;

    world
        .procurements
        .update_status(&carl, procurement.id, status(ProcurementStatus::Open))
        .await
        .unwrap();
    world
        .procurements
        .submit_proposal(
            &carl,
            procurement.id,
            SubmitProposalRequest {
                amount_cents: 99_000,
                currency: Some("USD".to_string()),
                file_ref: Some("blob:offer".to_string()),
                cc: Vec::new(),
            },
        )
        .await
        .unwrap();

    let canceled = world
        .procurements
        .update_status(&carl, procurement.id, status(ProcurementStatus::Open))
        .await
        .unwrap();
    assert_eq!(canceled.status, ProcurementStatus::Open);
    assert_eq!(canceled.proposal_amount_cents, 0);
    assert_eq!(canceled.proposal_currency, DEFAULT_PROPOSAL_CURRENCY);
    assert_eq!(canceled.proposal_file_ref, None);

    let mut conn = db.pool().acquire().await.unwrap();
    let (_, messages) = store::list_messages(
        &mut conn,
        procurement.external_conversation_id,
        None,
        50,
        0,
    )
    .await
    .unwrap();
    assert_eq!(
        messages.last().unwrap().kind,
        MessageKind::ProposalCanceled
    );
}

#[tokio::test]
#[serial]
async fn test_quiet_transition_notifies_without_message() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let procurement = open_procurement(&world, &s).await;
    let carl = world.profile(s.coordinator).await;

    world
        .procurements
        .update_status(&carl, procurement.id, status(ProcurementStatus::Open))
        .await
        .unwrap();
    let before = external_total(&db, &procurement).await;

    let updated = world
        .procurements
        .update_status(&carl, procurement.id, status(ProcurementStatus::InProgress))
        .await
        .unwrap();
    assert_eq!(updated.status, ProcurementStatus::InProgress);

    // open -> inProgress is in the quiet set; no system message.
    assert_eq!(external_total(&db, &procurement).await, before);

    world.settle().await;
    assert!(world
        .notifier
        .delivered()
        .iter()
        .any(|(_, _, kind)| *kind == NotificationKind::ProcurementStatusChanged));
}

#[tokio::test]
#[serial]
async fn test_work_review_flow() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    db.reset().await;
    let world = TestWorld::new(db.pool().clone());
    let s = Scenario::seed(db.pool()).await;

    let procurement = open_procurement(&world, &s).await;
    let carl = world.profile(s.coordinator).await;
    let frank = world.profile(s.recipient).await;

    world
        .procurements
        .update_status(&carl, procurement.id, status(ProcurementStatus::Open))
        .await
        .unwrap();
    world
        .procurements
        .submit_proposal(
            &carl,
            procurement.id,
            SubmitProposalRequest {
                amount_cents: 480_000,
                currency: None,
                file_ref: None,
                cc: Vec::new(),
            },
        )
        .await
        .unwrap();
    let accepted = world
        .procurements
        .update_status(
            &frank,
            procurement.id,
            ProcurementStatusRequest {
                status: ProcurementStatus::Accepted,
                reason: None,
                rating: Some(4),
            },
        )
        .await
        .unwrap();
    assert_eq!(accepted.rating, Some(4));

    world
        .procurements
        .update_status(&carl, procurement.id, status(ProcurementStatus::WorkInProgress))
        .await
        .unwrap();
    world
        .procurements
        .update_status(&carl, procurement.id, status(ProcurementStatus::WorkFinished))
        .await
        .unwrap();

    // Finished work leaves only through the review.
    let err = world
        .procurements
        .update_status(&carl, procurement.id, status(ProcurementStatus::Open))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        CoreError::InvalidTransition { code, .. } if code == codes::STATUS_NOT_ALLOWED
    );

    // And the provider cannot review its own work.
    let err = world
        .procurements
        .review_work(
            &carl,
            procurement.id,
            WorkReviewRequest {
                accept: true,
                rating: Some(5),
                reason: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Forbidden { .. });

    // Rejection sends the case back to work-in-progress.
    let rejected = world
        .procurements
        .review_work(
            &frank,
            procurement.id,
            WorkReviewRequest {
                accept: false,
                rating: None,
                reason: Some("Vibration on startup".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, ProcurementStatus::WorkInProgress);

    world
        .procurements
        .update_status(&carl, procurement.id, status(ProcurementStatus::WorkFinished))
        .await
        .unwrap();
    let closed = world
        .procurements
        .review_work(
            &frank,
            procurement.id,
            WorkReviewRequest {
                accept: true,
                rating: Some(5),
                reason: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(closed.status, ProcurementStatus::Closed);
    assert_eq!(closed.rating, Some(5));

    let mut conn = db.pool().acquire().await.unwrap();
    let (_, messages) = store::list_messages(
        &mut conn,
        procurement.external_conversation_id,
        None,
        50,
        0,
    )
    .await
    .unwrap();
    assert_eq!(
        messages.last().unwrap().kind,
        MessageKind::ProcurementClosed
    );
}
