//! Conversation HTTP Handlers
//!
//! Thin translation layer over [`ChatService`](super::ChatService):
//! resolve the caller's profile, delegate, serialize. Listing endpoints
//! skip the profile lookup because they only need the caller's id.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::backend::error::ApiResult;
use crate::backend::middleware::auth::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::chat::{
    AddParticipantRequest, Conversation, ListMessagesQuery, MarkReadRequest, Message, MessagePage,
    NewConversationRequest, NewMessageRequest, Participant, UnreadCount,
};
use crate::shared::org::UserProfile;

/// Conversations the caller participates in, newest first
pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Conversation>>> {
    Ok(Json(state.chat.my_conversations(user.id).await?))
}

/// Create an ad-hoc conversation (direct, group or channel)
pub async fn create_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<NewConversationRequest>,
) -> ApiResult<Json<Conversation>> {
    let actor = state.membership.profile(user.id).await?;
    Ok(Json(state.chat.create(&actor, request).await?))
}

/// Unread message totals per conversation
pub async fn unread_counts(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<UnreadCount>>> {
    Ok(Json(state.chat.unread(user.id).await?))
}

/// One page of a conversation's history; also advances the read marker
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Json<MessagePage>> {
    let actor = state.membership.profile(user.id).await?;
    Ok(Json(
        state.chat.messages(&actor, conversation_id, query).await?,
    ))
}

/// Post a text message
pub async fn post_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Json(request): Json<NewMessageRequest>,
) -> ApiResult<Json<Message>> {
    let actor = state.membership.profile(user.id).await?;
    Ok(Json(
        state.chat.post(&actor, conversation_id, request).await?,
    ))
}

/// Explicitly move the caller's read marker
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Json(request): Json<MarkReadRequest>,
) -> ApiResult<StatusCode> {
    let actor = state.membership.profile(user.id).await?;
    state
        .chat
        .mark_read(&actor, conversation_id, request.message_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Soft-delete one of the caller's own messages
pub async fn delete_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path((conversation_id, message_id)): Path<(Uuid, i64)>,
) -> ApiResult<Json<Message>> {
    let actor = state.membership.profile(user.id).await?;
    Ok(Json(
        state
            .chat
            .delete_message(&actor, conversation_id, message_id)
            .await?,
    ))
}

/// Add (or reactivate) a participant
pub async fn add_participant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Json(request): Json<AddParticipantRequest>,
) -> ApiResult<Json<Participant>> {
    let actor = state.membership.profile(user.id).await?;
    Ok(Json(
        state
            .chat
            .add_participant(&actor, conversation_id, request.user_id)
            .await?,
    ))
}

/// Deactivate a participant
pub async fn remove_participant(
    State(state): State<AppState>,
    user: AuthUser,
    Path((conversation_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Participant>> {
    let actor = state.membership.profile(user.id).await?;
    Ok(Json(
        state
            .chat
            .remove_participant(&actor, conversation_id, user_id)
            .await?,
    ))
}

/// Users the policy would let into this conversation right now
pub async fn available_participants(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    let actor = state.membership.profile(user.id).await?;
    Ok(Json(
        state
            .chat
            .available_participants(&actor, conversation_id)
            .await?,
    ))
}
