//! Ticket operations
//!
//! Creation, the generic status path, the recipient-side resolution review
//! and the priority change. Every write that touches more than one row runs
//! through `uow::run`; notification fan-out happens only after the commit.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::backend::chat::store as chat_store;
use crate::backend::membership::MembershipEngine;
use crate::backend::notify::{self, Notifier};
use crate::backend::uow;
use crate::shared::cases::{
    NewTicketRequest, ResolutionReviewRequest, Ticket, TicketPriority, TicketPriorityRequest,
    TicketStatus, TicketStatusRequest,
};
use crate::shared::chat::{ConversationKind, MessageKind};
use crate::shared::error::{codes, CoreError, CoreResult};
use crate::shared::org::UserProfile;

use super::store;
use super::transitions;

/// Ticket workflow service.
#[derive(Clone)]
pub struct TicketService {
    pool: sqlx::PgPool,
    membership: MembershipEngine,
    notifier: Arc<dyn Notifier>,
}

impl TicketService {
    pub fn new(
        pool: sqlx::PgPool,
        membership: MembershipEngine,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool,
            membership,
            notifier,
        }
    }

    /// Create a ticket: case row, both conversations with their initial
    /// participant sets, and the opening message, atomically.
    pub async fn create(&self, actor: &UserProfile, req: NewTicketRequest) -> CoreResult<Ticket> {
        let parties = self
            .membership
            .resolve_parties(actor.id, req.recipient_id, req.project_id)
            .await?;
        let (external_ids, internal_ids) = self.membership.initial_participants(&parties).await?;

        let actor_id = actor.id;
        let now = Utc::now();

        let ticket = uow::run(&self.pool, move |tx| {
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

                let ticket = Ticket {
                    id: Uuid::new_v4(),
                    project_id: req.project_id,
                    created_by: actor_id,
                    recipient_id: req.recipient_id,
                    external_conversation_id: external.id,
                    internal_conversation_id: internal.id,
                    status: TicketStatus::New,
                    status_updated_at: now,
                    title: req.title.clone(),
                    description: req.description.clone(),
                    priority: req.priority.unwrap_or(TicketPriority::Normal),
                    due_date: req.due_date,
                    opened_at: None,
                    on_hold_at: None,
                    rating: None,
                    created_at: now,
                    updated_at: now,
                };
                store::insert_ticket(&mut **tx, &ticket).await?;

                chat_store::post_message(
                    &mut **tx,
                    external.id,
                    Some(actor_id),
                    MessageKind::UserNewTicket,
                    &req.description,
                    &[],
                    serde_json::json!({ "ticketId": ticket.id }),
                )
                .await?;

                Ok(ticket)
            })
        })
        .await?;

        let recipients = self
            .external_participants(ticket.external_conversation_id)
            .await;
        notify::fan_out(
            self.notifier.clone(),
            actor.id,
            recipients,
            transitions::case_opened_notification(),
            serde_json::json!({
                "caseType": "ticket",
                "caseId": ticket.id,
                "projectId": ticket.project_id,
                "status": ticket.status,
            }),
        );

        Ok(ticket)
    }

    /// Fetch a ticket the actor is allowed to see.
    pub async fn get(&self, actor: &UserProfile, id: Uuid) -> CoreResult<Ticket> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        let ticket = store::get_ticket(&mut conn, id).await?;
        self.check_view_access(&ticket, actor).await?;
        Ok(ticket)
    }

    /// Generic status path: table lookup, auto-enrollment, conditional row
    /// update, system message, post-commit notification fan-out.
    pub async fn update_status(
        &self,
        actor: &UserProfile,
        id: Uuid,
        req: TicketStatusRequest,
    ) -> CoreResult<Ticket> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        let ticket = store::get_ticket(&mut conn, id).await?;
        drop(conn);

        let effect = transitions::ticket_transition(ticket.status, req.status).ok_or_else(|| {
            CoreError::invalid_transition(
                codes::STATUS_NOT_ALLOWED,
                format!(
                    "ticket cannot go from {} to {}",
                    ticket.status.as_str(),
                    req.status.as_str()
                ),
            )
        })?;

        let parties = self
            .membership
            .resolve_parties(ticket.created_by, ticket.recipient_id, ticket.project_id)
            .await?;

        let membership = self.membership.clone();
        let actor_profile = actor.clone();
        let previous = ticket.status;
        let reason = req.reason.clone().unwrap_or_default();
        let now = Utc::now();

        let (updated, recipients) = uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let external =
                    chat_store::get_conversation(&mut **tx, ticket.external_conversation_id)
                        .await?;
                membership
                    .ensure_active(
                        &mut **tx,
                        &parties,
                        &external,
                        ticket.internal_conversation_id,
                        &actor_profile,
                    )
                    .await?;

                let mut updated = ticket.clone();
                transitions::apply_ticket_effect(&mut updated, req.status, &effect, now);
                store::persist_ticket_transition(&mut **tx, &updated, previous).await?;

                if let Some(kind) = effect.message {
                    chat_store::post_message(
                        &mut **tx,
                        updated.external_conversation_id,
                        None,
                        kind,
                        &reason,
                        &[],
                        serde_json::json!({
                            "ticketId": updated.id,
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
            transitions::ticket_notification(),
            serde_json::json!({
                "caseType": "ticket",
                "caseId": updated.id,
                "projectId": updated.project_id,
                "previousStatus": previous,
                "newStatus": updated.status,
            }),
        );

        Ok(updated)
    }

    /// Recipient-side review of a resolved ticket: accept closes with a
    /// rating, reject reopens.
    pub async fn review_resolution(
        &self,
        actor: &UserProfile,
        id: Uuid,
        req: ResolutionReviewRequest,
    ) -> CoreResult<Ticket> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        let ticket = store::get_ticket(&mut conn, id).await?;
        drop(conn);

        if ticket.status != TicketStatus::Resolved {
            return Err(CoreError::invalid_transition(
                codes::STATUS_NOT_ALLOWED,
                "only a resolved ticket can be reviewed",
            ));
        }

        let parties = self
            .membership
            .resolve_parties(ticket.created_by, ticket.recipient_id, ticket.project_id)
            .await?;
        if actor.org_id != parties.recipient_org_id {
            return Err(CoreError::forbidden(
                "only the recipient organization may review a resolution",
            ));
        }

        let (new_status, message_kind) = transitions::ticket_review_effect(req.accept);
        let membership = self.membership.clone();
        let actor_profile = actor.clone();
        let previous = ticket.status;
        let reason = req.reason.clone().unwrap_or_default();
        let rating = req.rating;
        let accept = req.accept;
        let now = Utc::now();

        let (updated, recipients) = uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let external =
                    chat_store::get_conversation(&mut **tx, ticket.external_conversation_id)
                        .await?;
                membership
                    .ensure_active(
                        &mut **tx,
                        &parties,
                        &external,
                        ticket.internal_conversation_id,
                        &actor_profile,
                    )
                    .await?;

                let mut updated = ticket.clone();
                updated.status = new_status;
                updated.status_updated_at = now;
                updated.updated_at = now;
                if accept {
                    updated.rating = rating;
                }
                store::persist_ticket_transition(&mut **tx, &updated, previous).await?;

                chat_store::post_message(
                    &mut **tx,
                    updated.external_conversation_id,
                    None,
                    message_kind,
                    &reason,
                    &[],
                    serde_json::json!({
                        "ticketId": updated.id,
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
            transitions::ticket_notification(),
            serde_json::json!({
                "caseType": "ticket",
                "caseId": updated.id,
                "projectId": updated.project_id,
                "previousStatus": previous,
                "newStatus": updated.status,
            }),
        );

        Ok(updated)
    }

    /// Change priority. The due date is a required companion field; this is
    /// not a status transition and posts no message.
    pub async fn change_priority(
        &self,
        actor: &UserProfile,
        id: Uuid,
        req: TicketPriorityRequest,
    ) -> CoreResult<Ticket> {
        let due_date = req.due_date.ok_or_else(|| {
            CoreError::invalid_transition(
                codes::DUE_DATE_REQUIRED,
                "changing priority requires a due date",
            )
        })?;

        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        let ticket = store::get_ticket(&mut conn, id).await?;
        self.check_view_access(&ticket, actor).await?;

        store::update_ticket_priority(&mut conn, id, req.priority, due_date).await
    }

    /// Viewing needs standing on either channel of the case.
    async fn check_view_access(&self, ticket: &Ticket, actor: &UserProfile) -> CoreResult<()> {
        let parties = self
            .membership
            .resolve_parties(ticket.created_by, ticket.recipient_id, ticket.project_id)
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

    /// Audience for the post-commit creation fan-out. Failures here only
    /// shrink the audience.
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
