//! Conversation operations
//!
//! Every chat-touching operation on a case-bound conversation starts by
//! ensuring the actor is an active participant (the lazy enrollment rule);
//! ad-hoc conversations (direct/group/channel) require explicit membership
//! instead. Multi-row writes run through `uow::run`.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::backend::cases::store as cases_store;
use crate::backend::membership::{CaseParties, MembershipEngine};
use crate::backend::uow;
use crate::shared::chat::{
    Conversation, ListMessagesQuery, Message, MessageKind, MessagePage, NewConversationRequest,
    NewMessageRequest, Participant, UnreadCount,
};
use crate::shared::error::{codes, CoreError, CoreResult};
use crate::shared::org::UserProfile;

use super::store;

/// Page size when the caller does not ask for one.
const DEFAULT_PAGE_SIZE: i64 = 50;
/// Hard ceiling on a single page.
const MAX_PAGE_SIZE: i64 = 200;

/// Conversation service shared by the chat and case HTTP surfaces.
#[derive(Clone)]
pub struct ChatService {
    pool: PgPool,
    membership: MembershipEngine,
}

impl ChatService {
    pub fn new(pool: PgPool, membership: MembershipEngine) -> Self {
        Self { pool, membership }
    }

    /// Conversations the user is an active participant of, newest first.
    pub async fn my_conversations(&self, user_id: Uuid) -> CoreResult<Vec<Conversation>> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        store::conversations_for_user(&mut conn, user_id).await
    }

    /// Unread totals across all of the user's conversations, in the same
    /// order as [`my_conversations`](Self::my_conversations).
    pub async fn unread(&self, user_id: Uuid) -> CoreResult<Vec<UnreadCount>> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        let conversations = store::conversations_for_user(&mut conn, user_id).await?;
        let ids: Vec<Uuid> = conversations.iter().map(|c| c.id).collect();
        let counts = store::unread_counts(&mut conn, user_id, &ids).await?;

        Ok(conversations
            .iter()
            .map(|c| UnreadCount {
                conversation_id: c.id,
                unread: counts.get(&c.id).copied().unwrap_or(0),
            })
            .collect())
    }

    /// Create an ad-hoc conversation. Case-bound kinds are created with
    /// their case, never directly.
    pub async fn create(
        &self,
        actor: &UserProfile,
        req: NewConversationRequest,
    ) -> CoreResult<Conversation> {
        if req.kind.is_case_bound() {
            return Err(CoreError::constraint(
                codes::CASE_BOUND_CONVERSATION,
                "external and internal conversations are created with their case",
            ));
        }

        let mut ids = vec![actor.id];
        ids.extend(req.participant_ids.iter().copied());

        uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                store::create_conversation(&mut **tx, req.kind, &ids, req.title.as_deref()).await
            })
        })
        .await
    }

    /// Post a user message. Enrollment and the insert share one transaction.
    pub async fn post(
        &self,
        actor: &UserProfile,
        conversation_id: Uuid,
        req: NewMessageRequest,
    ) -> CoreResult<Message> {
        let service = self.clone();
        let actor = actor.clone();

        uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let conversation = store::get_conversation(&mut **tx, conversation_id).await?;
                service
                    .ensure_member(&mut **tx, &conversation, &actor)
                    .await?;

                store::post_message(
                    &mut **tx,
                    conversation_id,
                    Some(actor.id),
                    MessageKind::Text,
                    &req.body,
                    &req.attachments,
                    serde_json::json!({}),
                )
                .await
            })
        })
        .await
    }

    /// One page of history, oldest first. Fetching a page acknowledges it:
    /// the caller's read marker advances to the newest id in the page (and
    /// never backwards, so re-reading old pages is harmless).
    pub async fn messages(
        &self,
        actor: &UserProfile,
        conversation_id: Uuid,
        query: ListMessagesQuery,
    ) -> CoreResult<MessagePage> {
        let service = self.clone();
        let actor_profile = actor.clone();
        uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let conversation = store::get_conversation(&mut **tx, conversation_id).await?;
                service
                    .ensure_member(&mut **tx, &conversation, &actor_profile)
                    .await?;
                Ok(())
            })
        })
        .await?;

        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = query.offset.unwrap_or(0).max(0);

        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        let (total, messages) =
            store::list_messages(&mut conn, conversation_id, query.after_id, limit, offset).await?;

        if let Some(newest) = messages.last() {
            store::mark_read(&mut conn, conversation_id, actor.id, newest.id).await?;
        }

        Ok(MessagePage { messages, total })
    }

    /// Advance the caller's read marker. Never moves backwards.
    pub async fn mark_read(
        &self,
        actor: &UserProfile,
        conversation_id: Uuid,
        message_id: i64,
    ) -> CoreResult<()> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::from)?;
        store::mark_read(&mut conn, conversation_id, actor.id, message_id).await
    }

    /// Soft-delete a message and post the audit event atomically. Only the
    /// author may delete; a deletion without its audit message (or the other
    /// way round) must never be observable.
    pub async fn delete_message(
        &self,
        actor: &UserProfile,
        conversation_id: Uuid,
        message_id: i64,
    ) -> CoreResult<Message> {
        let actor_id = actor.id;

        uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let message = store::get_message(&mut **tx, conversation_id, message_id).await?;
                if message.author_id != Some(actor_id) {
                    return Err(CoreError::forbidden("only the author may delete a message"));
                }

                let deleted =
                    store::soft_delete_message(&mut **tx, conversation_id, message_id).await?;

                store::post_message(
                    &mut **tx,
                    conversation_id,
                    None,
                    MessageKind::MessageDeleted,
                    "",
                    &[],
                    serde_json::json!({
                        "messageId": message_id,
                        "deletedBy": actor_id,
                    }),
                )
                .await?;

                Ok(deleted)
            })
        })
        .await
    }

    /// Add (or reactivate) a participant. Case-bound conversations go
    /// through the membership policy; ad-hoc ones only require the actor to
    /// be an active member.
    pub async fn add_participant(
        &self,
        actor: &UserProfile,
        conversation_id: Uuid,
        candidate_id: Uuid,
    ) -> CoreResult<Participant> {
        let service = self.clone();
        let actor = actor.clone();

        uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let conversation = store::get_conversation(&mut **tx, conversation_id).await?;
                service
                    .ensure_member(&mut **tx, &conversation, &actor)
                    .await?;

                if conversation.kind.is_case_bound() {
                    let (parties, internal_id) =
                        service.case_context(&mut **tx, &conversation).await?;
                    service
                        .membership
                        .add_participant(
                            &mut **tx,
                            &parties,
                            &conversation,
                            internal_id,
                            candidate_id,
                        )
                        .await
                } else {
                    store::set_participant_active(&mut **tx, conversation_id, candidate_id, true)
                        .await
                }
            })
        })
        .await
    }

    /// Deactivate a participant. The internal-conversation last-org guard
    /// lives in the membership engine.
    pub async fn remove_participant(
        &self,
        actor: &UserProfile,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> CoreResult<Participant> {
        let service = self.clone();
        let actor = actor.clone();

        uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let conversation = store::get_conversation(&mut **tx, conversation_id).await?;
                service
                    .ensure_member(&mut **tx, &conversation, &actor)
                    .await?;

                if conversation.kind.is_case_bound() {
                    service
                        .membership
                        .remove_participant(&mut **tx, &conversation, user_id)
                        .await
                } else {
                    store::set_participant_active(&mut **tx, conversation_id, user_id, false).await
                }
            })
        })
        .await
    }

    /// Users who could be added to a case-bound conversation right now.
    /// Ad-hoc conversations have no policy-derived candidate pool.
    pub async fn available_participants(
        &self,
        actor: &UserProfile,
        conversation_id: Uuid,
    ) -> CoreResult<Vec<UserProfile>> {
        let service = self.clone();
        let actor = actor.clone();

        uow::run(&self.pool, move |tx| {
            Box::pin(async move {
                let conversation = store::get_conversation(&mut **tx, conversation_id).await?;
                service
                    .ensure_member(&mut **tx, &conversation, &actor)
                    .await?;

                if !conversation.kind.is_case_bound() {
                    return Ok(Vec::new());
                }

                let (parties, _) = service.case_context(&mut **tx, &conversation).await?;
                service
                    .membership
                    .available_participants(&mut **tx, &parties, &conversation)
                    .await
            })
        })
        .await
    }

    /// The case behind a case-bound conversation, as membership input.
    async fn case_context(
        &self,
        conn: &mut PgConnection,
        conversation: &Conversation,
    ) -> CoreResult<(CaseParties, Uuid)> {
        if let Some(ticket) =
            cases_store::ticket_by_conversation(&mut *conn, conversation.id).await?
        {
            let parties = self
                .membership
                .resolve_parties(ticket.created_by, ticket.recipient_id, ticket.project_id)
                .await?;
            return Ok((parties, ticket.internal_conversation_id));
        }

        if let Some(procurement) =
            cases_store::procurement_by_conversation(&mut *conn, conversation.id).await?
        {
            let parties = self
                .membership
                .resolve_parties(
                    procurement.created_by,
                    procurement.recipient_id,
                    procurement.project_id,
                )
                .await?;
            return Ok((parties, procurement.internal_conversation_id));
        }

        Err(CoreError::not_found("case"))
    }

    /// Case-bound: lazy-enroll per the membership policy. Ad-hoc: the actor
    /// must already be an active participant.
    async fn ensure_member(
        &self,
        conn: &mut PgConnection,
        conversation: &Conversation,
        actor: &UserProfile,
    ) -> CoreResult<()> {
        if conversation.kind.is_case_bound() {
            let (parties, internal_id) = self.case_context(&mut *conn, conversation).await?;
            self.membership
                .ensure_active(&mut *conn, &parties, conversation, internal_id, actor)
                .await?;
            return Ok(());
        }

        match store::get_participant(&mut *conn, conversation.id, actor.id).await? {
            Some(participant) if participant.active => Ok(()),
            _ => Err(CoreError::forbidden(
                "not a participant in this conversation",
            )),
        }
    }
}
