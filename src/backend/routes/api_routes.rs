/**
 * API Route Table
 *
 * Every route below runs behind the bearer-token middleware installed in
 * `router.rs`; handlers receive the verified caller as `AuthUser`.
 *
 * # Routes
 *
 * ## Conversations
 * - `GET    /api/conversations` - conversations the caller participates in
 * - `POST   /api/conversations` - create an ad-hoc conversation
 * - `GET    /api/conversations/unread` - unread totals per conversation
 * - `GET    /api/conversations/{conversation_id}/messages` - page history
 * - `POST   /api/conversations/{conversation_id}/messages` - post a message
 * - `DELETE /api/conversations/{conversation_id}/messages/{message_id}` - soft-delete own message
 * - `POST   /api/conversations/{conversation_id}/read` - advance read marker
 * - `POST   /api/conversations/{conversation_id}/participants` - add participant
 * - `GET    /api/conversations/{conversation_id}/participants/available` - addable users
 * - `DELETE /api/conversations/{conversation_id}/participants/{user_id}` - remove participant
 *
 * ## Tickets
 * - `POST  /api/tickets` - open a ticket
 * - `GET   /api/tickets/{ticket_id}` - fetch one ticket
 * - `PATCH /api/tickets/{ticket_id}/status` - status transition
 * - `PATCH /api/tickets/{ticket_id}/priority` - change priority (needs due date)
 * - `POST  /api/tickets/{ticket_id}/review` - accept/reject a resolution
 *
 * ## Procurements
 * - `POST  /api/procurements` - open a procurement
 * - `GET   /api/procurements/{procurement_id}` - fetch one procurement
 * - `PATCH /api/procurements/{procurement_id}/status` - status transition
 * - `POST  /api/procurements/{procurement_id}/proposal` - submit/replace proposal
 * - `POST  /api/procurements/{procurement_id}/review` - accept/reject finished work
 */

use axum::Router;

use crate::backend::cases::handlers::{
    create_procurement, create_ticket, get_procurement, get_ticket, review_procurement,
    review_ticket, submit_proposal, update_procurement_status, update_ticket_priority,
    update_ticket_status,
};
use crate::backend::chat::handlers::{
    add_participant, available_participants, create_conversation, delete_message, list_messages,
    list_conversations, mark_read, post_message, remove_participant, unread_counts,
};
use crate::backend::server::state::AppState;

/// Configure API routes
///
/// # Arguments
///
/// * `router` - The router to add routes to
///
/// # Returns
///
/// Router with all conversation, ticket and procurement routes configured
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        // Conversation endpoints
        .route(
            "/api/conversations",
            axum::routing::get(list_conversations).post(create_conversation),
        )
        .route(
            "/api/conversations/unread",
            axum::routing::get(unread_counts),
        )
        .route(
            "/api/conversations/{conversation_id}/messages",
            axum::routing::get(list_messages).post(post_message),
        )
        .route(
            "/api/conversations/{conversation_id}/messages/{message_id}",
            axum::routing::delete(delete_message),
        )
        .route(
            "/api/conversations/{conversation_id}/read",
            axum::routing::post(mark_read),
        )
        .route(
            "/api/conversations/{conversation_id}/participants",
            axum::routing::post(add_participant),
        )
        .route(
            "/api/conversations/{conversation_id}/participants/available",
            axum::routing::get(available_participants),
        )
        .route(
            "/api/conversations/{conversation_id}/participants/{user_id}",
            axum::routing::delete(remove_participant),
        )
        // Ticket endpoints
        .route("/api/tickets", axum::routing::post(create_ticket))
        .route("/api/tickets/{ticket_id}", axum::routing::get(get_ticket))
        .route(
            "/api/tickets/{ticket_id}/status",
            axum::routing::patch(update_ticket_status),
        )
        .route(
            "/api/tickets/{ticket_id}/priority",
            axum::routing::patch(update_ticket_priority),
        )
        .route(
            "/api/tickets/{ticket_id}/review",
            axum::routing::post(review_ticket),
        )
        // Procurement endpoints
        .route(
            "/api/procurements",
            axum::routing::post(create_procurement),
        )
        .route(
            "/api/procurements/{procurement_id}",
            axum::routing::get(get_procurement),
        )
        .route(
            "/api/procurements/{procurement_id}/status",
            axum::routing::patch(update_procurement_status),
        )
        .route(
            "/api/procurements/{procurement_id}/proposal",
            axum::routing::post(submit_proposal),
        )
        .route(
            "/api/procurements/{procurement_id}/review",
            axum::routing::post(review_procurement),
        )
}
