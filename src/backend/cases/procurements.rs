//! Procurement operations
//!
//! Mirrors the ticket service, with two extra paths: proposal submission
//! (which also emails the client) and the recipient-side work review.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::backend::chat::store as chat_store;
use crate::backend::mail::ProposalMailer;
use crate::backend::membership::MembershipEngine;
use crate::backend::notify::{self, Notifier};
use crate::backend::uow;
use crate::shared::cases::{
    NewProcurementRequest, Procurement, ProcurementStatus, ProcurementStatusRequest,
    SubmitProposalRequest, WorkReviewRequest, DEFAULT_PROPOSAL_CURRENCY,
};
use crate::shared::chat::{ConversationKind, MessageKind};
use crate::shared::error::{codes, CoreError, CoreResult};
use crate::shared::notification::NotificationKind;
use crate::shared::org::UserProfile;

use super::store;
use super::transitions;

/// Procurement workflow service.
#[derive(Clone)]
pub struct ProcurementService {
    pool: sqlx::PgPool,
    membership: MembershipEngine,
    notifier: Arc<dyn Notifier>,
    mailer: Arc<dyn ProposalMailer>,
}

impl ProcurementService {
    pub fn new(
        pool: sqlx::PgPool,
        membership: MembershipEngine,
        notifier: Arc<dyn Notifier>,
        mailer: Arc<dyn ProposalMailer>,
    ) -> Self {
        Self {
            pool,
            membership,
            notifier,
            mailer,
        }
    }

    /// Create a procurement: case row, both conversations and the opening
    /// message, atomically.
    pub async fn create(
        &self,
        actor: &UserProfile,
        req: NewProcurementRequest,
    ) -> CoreResult<Procurement> {
        let parties = self
            .membership
            .resolve_parties(actor.id, req.recipient_id, req.project_id)
            .await?;
        let (external_ids, internal_ids) = self.membership.initial_participants(&parties).await?;

        let actor_id = actor.id;
        let now = Utc::now();

        let procurement = uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let external = chat_store::create_conversation(
                    &mut **tx,
                    ConversationKind::External,
                    &external_ids,
                    Some(&req.title),
                )
                .await?;
                let internal = chat_store::create_conversation(
                    &mut **tx,
                    ConversationKind::Internal,
                    &internal_ids,
                    Some(&req.title),
                )
                .await?;

                let procurement = Procurement {
                    id: Uuid::new_v4(),
                    project_id: req.project_id,
                    created_by: actor_id,
                    recipient_id: req.recipient_id,
                    external_conversation_id: external.id,
                    internal_conversation_id: internal.id,
                    status: ProcurementStatus::New,
                    status_updated_at: now,
                    title: req.title.clone(),
                    description: req.description.clone(),
                    due_date: req.due_date,
                    rating: None,
                    proposal_amount_cents: 0,
                    proposal_currency: DEFAULT_PROPOSAL_CURRENCY.to_string(),
                    proposal_file_ref: None,
                    created_at: now,
                    updated_at: now,
                };
                store::insert_procurement(&mut **tx, &procurement).await?;

                chat_store::post_message(
                    &mut **tx,
                    external.id,
                    Some(actor_id),
                    MessageKind::UserNewProcurement,
                    &req.description,
                    &[],
                    serde_json::json!({ "procurementId": procurement.id }),
                )
                .await?;

                Ok(procurement)
            })
        })
        .await?;

        let recipients = self
            .external_participants(procurement.external_conversation_id)
            .await;
        notify::fan_out(
            self.notifier.clone(),
            actor.id,
            recipients,
            transitions::case_opened_notification(),
            serde_json::json!({
                "caseType": "procurement",
                "caseId": procurement.id,
                "projectId": procurement.project_id,
                "status": procurement.status,
            }),
        );

        Ok(procurement)
    }

    /// Fetch a procurement the actor is allowed to see.
    pub async fn get(&self, actor: &UserProfile, id: Uuid) -> CoreResult<Procurement> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        let procurement = store::get_procurement(&mut conn, id).await?;
        self.check_view_access(&procurement, actor).await?;
        Ok(procurement)
    }

    /// Generic status path. Quiet transitions post no message but still
    /// notify.
    pub async fn update_status(
        &self,
        actor: &UserProfile,
        id: Uuid,
        req: ProcurementStatusRequest,
    ) -> CoreResult<Procurement> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        let procurement = store::get_procurement(&mut conn, id).await?;
        drop(conn);

        let effect =
            transitions::procurement_transition(procurement.status, req.status).ok_or_else(
                || {
                    CoreError::invalid_transition(
                        codes::STATUS_NOT_ALLOWED,
                        format!(
                            "procurement cannot go from {} to {}",
                            procurement.status.as_str(),
                            req.status.as_str()
                        ),
                    )
                },
            )?;

        let parties = self
            .membership
            .resolve_parties(
                procurement.created_by,
                procurement.recipient_id,
                procurement.project_id,
            )
            .await?;

        let membership = self.membership.clone();
        let actor_profile = actor.clone();
        let previous = procurement.status;
        let reason = req.reason.clone().unwrap_or_default();
        let rating = req.rating;
        let now = Utc::now();

        let (updated, recipients) = uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let external =
                    chat_store::get_conversation(&mut **tx, procurement.external_conversation_id)
                        .await?;
                membership
                    .ensure_active(
                        &mut **tx,
                        &parties,
                        &external,
                        procurement.internal_conversation_id,
                        &actor_profile,
                    )
                    .await?;

                let mut updated = procurement.clone();
                transitions::apply_procurement_effect(&mut updated, req.status, &effect, rating, now);
                store::persist_procurement_transition(&mut **tx, &updated, previous).await?;

                if let Some(kind) = effect.message {
                    chat_store::post_message(
                        &mut **tx,
                        updated.external_conversation_id,
                        None,
                        kind,
                        &reason,
                        &[],
                        serde_json::json!({
                            "procurementId": updated.id,
                            "previousStatus": previous,
                            "newStatus": updated.status,
                        }),
                    )
                    .await?;
                }

                let recipients: Vec<Uuid> =
                    chat_store::active_participants(&mut **tx, updated.external_conversation_id)
                        .await?
                        .into_iter()
                        .map(|p| p.user_id)
                        .collect();

                Ok((updated, recipients))
            })
        })
        .await?;

        notify::fan_out(
            self.notifier.clone(),
            actor.id,
            recipients,
            transitions::procurement_notification(),
            serde_json::json!({
                "caseType": "procurement",
                "caseId": updated.id,
                "projectId": updated.project_id,
                "previousStatus": previous,
                "newStatus": updated.status,
            }),
        );

        Ok(updated)
    }

    /// Submit (or replace) the provider's proposal. Valid only while the
    /// case sits in `open` or `inProgress`; also emails the client.
    pub async fn submit_proposal(
        &self,
        actor: &UserProfile,
        id: Uuid,
        req: SubmitProposalRequest,
    ) -> CoreResult<Procurement> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        let procurement = store::get_procurement(&mut conn, id).await?;
        drop(conn);

        if !transitions::proposal_submittable_from(procurement.status) {
            return Err(CoreError::invalid_transition(
                codes::PROPOSAL_NOT_OPEN,
                format!(
                    "a proposal cannot be submitted while the procurement is {}",
                    procurement.status.as_str()
                ),
            ));
        }

        let parties = self
            .membership
            .resolve_parties(
                procurement.created_by,
                procurement.recipient_id,
                procurement.project_id,
            )
            .await?;
        let recipient = self.membership.profile(procurement.recipient_id).await?;

        let membership = self.membership.clone();
        let actor_profile = actor.clone();
        let previous = procurement.status;
        let amount_cents = req.amount_cents;
        let currency = req
            .currency
            .clone()
            .unwrap_or_else(|| DEFAULT_PROPOSAL_CURRENCY.to_string());
        let file_ref = req.file_ref.clone();
        let now = Utc::now();

        let (updated, recipients) = uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let external =
                    chat_store::get_conversation(&mut **tx, procurement.external_conversation_id)
                        .await?;
                membership
                    .ensure_active(
                        &mut **tx,
                        &parties,
                        &external,
                        procurement.internal_conversation_id,
                        &actor_profile,
                    )
                    .await?;

                let mut updated = procurement.clone();
                updated.status = ProcurementStatus::ProposalSubmitted;
                updated.status_updated_at = now;
                updated.updated_at = now;
                updated.proposal_amount_cents = amount_cents;
                updated.proposal_currency = currency;
                updated.proposal_file_ref = file_ref;
                store::persist_procurement_transition(&mut **tx, &updated, previous).await?;

                chat_store::post_message(
                    &mut **tx,
                    updated.external_conversation_id,
                    None,
                    MessageKind::ProposalSubmitted,
                    "",
                    &[],
                    serde_json::json!({
                        "procurementId": updated.id,
                        "amountCents": updated.proposal_amount_cents,
                        "currency": updated.proposal_currency,
                    }),
                )
                .await?;

                let recipients: Vec<Uuid> =
                    chat_store::active_participants(&mut **tx, updated.external_conversation_id)
                        .await?
                        .into_iter()
                        .map(|p| p.user_id)
                        .collect();

                Ok((updated, recipients))
            })
        })
        .await?;

        // Email delivery stays outside the transaction; a mail failure must
        // never roll back the proposal.
        let mailer = self.mailer.clone();
        let mail_copy = updated.clone();
        let to = recipient.email.clone();
        let cc = req.cc.clone();
        tokio::spawn(async move {
            if let Err(err) = mailer.send_proposal(&mail_copy, &to, &cc).await {
                tracing::warn!(
                    "Proposal email for procurement {} failed: {}",
                    mail_copy.id,
                    err
                );
            }
        });

        notify::fan_out(
            self.notifier.clone(),
            actor.id,
            recipients,
            NotificationKind::ProposalSubmitted,
            serde_json::json!({
                "caseType": "procurement",
                "caseId": updated.id,
                "projectId": updated.project_id,
                "amountCents": updated.proposal_amount_cents,
                "currency": updated.proposal_currency,
            }),
        );

        Ok(updated)
    }

    /// Recipient-side review of finished work: accept closes with a rating,
    /// reject sends the case back to `workInProgress`.
    pub async fn review_work(
        &self,
        actor: &UserProfile,
        id: Uuid,
        req: WorkReviewRequest,
    ) -> CoreResult<Procurement> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        let procurement = store::get_procurement(&mut conn, id).await?;
        drop(conn);

        if procurement.status != ProcurementStatus::WorkFinished {
            return Err(CoreError::invalid_transition(
                codes::STATUS_NOT_ALLOWED,
                "only finished work can be reviewed",
            ));
        }

        let parties = self
            .membership
            .resolve_parties(
                procurement.created_by,
                procurement.recipient_id,
                procurement.project_id,
            )
            .await?;
        if actor.org_id != parties.recipient_org_id {
            return Err(CoreError::forbidden(
                "only the recipient organization may review finished work",
            ));
        }

        let (new_status, message_kind) = transitions::procurement_review_effect(req.accept);
        let membership = self.membership.clone();
        let actor_profile = actor.clone();
        let previous = procurement.status;
        let reason = req.reason.clone().unwrap_or_default();
        let rating = req.rating;
        let accept = req.accept;
        let now = Utc::now();

        let (updated, recipients) = uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let external =
                    chat_store::get_conversation(&mut **tx, procurement.external_conversation_id)
                        .await?;
                membership
                    .ensure_active(
                        &mut **tx,
                        &parties,
                        &external,
                        procurement.internal_conversation_id,
                        &actor_profile,
                    )
                    .await?;

                let mut updated = procurement.clone();
                updated.status = new_status;
                updated.status_updated_at = now;
                updated.updated_at = now;
                if accept {
                    updated.rating = rating;
                }
                store::persist_procurement_transition(&mut **tx, &updated, previous).await?;

                chat_store::post_message(
                    &mut **tx,
                    updated.external_conversation_id,
                    None,
                    message_kind,
                    &reason,
                    &[],
                    serde_json::json!({
                        "procurementId": updated.id,
                        "previousStatus": previous,
                        "newStatus": updated.status,
                    }),
                )
                .await?;

                let recipients: Vec<Uuid> =
                    chat_store::active_participants(&mut **tx, updated.external_conversation_id)
                        .await?
                        .into_iter()
                        .map(|p| p.user_id)
                        .collect();

                Ok((updated, recipients))
            })
        })
        .await?;

        notify::fan_out(
            self.notifier.clone(),
            actor.id,
            recipients,
            transitions::procurement_notification(),
            serde_json::json!({
                "caseType": "procurement",
                "caseId": updated.id,
                "projectId": updated.project_id,
                "previousStatus": previous,
                "newStatus": updated.status,
            }),
        );

        Ok(updated)
    }

    async fn check_view_access(
        &self,
        procurement: &Procurement,
        actor: &UserProfile,
    ) -> CoreResult<()> {
        let parties = self
            .membership
            .resolve_parties(
                procurement.created_by,
                procurement.recipient_id,
                procurement.project_id,
            )
            .await?;

        let external = self
            .membership
            .access_decision(&parties, ConversationKind::External, actor)
            .await?;
        let internal = self
            .membership
            .access_decision(&parties, ConversationKind::Internal, actor)
            .await?;

        use crate::backend::membership::Decision;
        match (external, internal) {
            (Decision::Deny(_), Decision::Deny(_)) => {
                Err(CoreError::forbidden("no standing on this case"))
            }
            _ => Ok(()),
        }
    }

    async fn external_participants(&self, conversation_id: Uuid) -> Vec<Uuid> {
        let Ok(mut conn) = self.pool.acquire().await else {
            return Vec::new();
        };
        chat_store::active_participants(&mut conn, conversation_id)
            .await
            .map(|participants| participants.into_iter().map(|p| p.user_id).collect())
            .unwrap_or_default()
    }
}
