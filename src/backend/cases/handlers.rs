//! Case HTTP Handlers
//!
//! Thin translation layer: resolve the caller's profile through the
//! directory, delegate to the ticket/procurement service, serialize the
//! result. All domain rules live in the services.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::backend::error::ApiResult;
use crate::backend::middleware::auth::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::cases::{
    NewProcurementRequest, NewTicketRequest, Procurement, ProcurementStatusRequest,
    ResolutionReviewRequest, SubmitProposalRequest, Ticket, TicketPriorityRequest,
    TicketStatusRequest, WorkReviewRequest,
};

/// Create a ticket together with its two conversations
pub async fn create_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<NewTicketRequest>,
) -> ApiResult<Json<Ticket>> {
    let actor = state.membership.profile(user.id).await?;
    let ticket = state.tickets.create(&actor, request).await?;
    Ok(Json(ticket))
}

/// Fetch one ticket
pub async fn get_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(ticket_id): Path<Uuid>,
) -> ApiResult<Json<Ticket>> {
    let actor = state.membership.profile(user.id).await?;
    let ticket = state.tickets.get(&actor, ticket_id).await?;
    Ok(Json(ticket))
}

/// Move a ticket along the generic transition table
pub async fn update_ticket_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<TicketStatusRequest>,
) -> ApiResult<Json<Ticket>> {
    let actor = state.membership.profile(user.id).await?;
    let ticket = state.tickets.update_status(&actor, ticket_id, request).await?;
    Ok(Json(ticket))
}

/// Change a ticket's priority (requires a due date)
pub async fn update_ticket_priority(
    State(state): State<AppState>,
    user: AuthUser,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<TicketPriorityRequest>,
) -> ApiResult<Json<Ticket>> {
    let actor = state.membership.profile(user.id).await?;
    let ticket = state
        .tickets
        .change_priority(&actor, ticket_id, request)
        .await?;
    Ok(Json(ticket))
}

/// Accept or reject a resolved ticket (recipient org only)
pub async fn review_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<ResolutionReviewRequest>,
) -> ApiResult<Json<Ticket>> {
    let actor = state.membership.profile(user.id).await?;
    let ticket = state
        .tickets
        .review_resolution(&actor, ticket_id, request)
        .await?;
    Ok(Json(ticket))
}

/// Create a procurement together with its two conversations
pub async fn create_procurement(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<NewProcurementRequest>,
) -> ApiResult<Json<Procurement>> {
    let actor = state.membership.profile(user.id).await?;
    let procurement = state.procurements.create(&actor, request).await?;
    Ok(Json(procurement))
}

/// Fetch one procurement
pub async fn get_procurement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(procurement_id): Path<Uuid>,
) -> ApiResult<Json<Procurement>> {
    let actor = state.membership.profile(user.id).await?;
    let procurement = state.procurements.get(&actor, procurement_id).await?;
    Ok(Json(procurement))
}

/// Move a procurement along the generic transition table
pub async fn update_procurement_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(procurement_id): Path<Uuid>,
    Json(request): Json<ProcurementStatusRequest>,
) -> ApiResult<Json<Procurement>> {
    let actor = state.membership.profile(user.id).await?;
    let procurement = state
        .procurements
        .update_status(&actor, procurement_id, request)
        .await?;
    Ok(Json(procurement))
}

/// Submit (or replace) the proposal; also emails the client
pub async fn submit_proposal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(procurement_id): Path<Uuid>,
    Json(request): Json<SubmitProposalRequest>,
) -> ApiResult<Json<Procurement>> {
    let actor = state.membership.profile(user.id).await?;
    let procurement = state
        .procurements
        .submit_proposal(&actor, procurement_id, request)
        .await?;
    Ok(Json(procurement))
}

/// Accept or reject finished work (recipient org only)
pub async fn review_procurement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(procurement_id): Path<Uuid>,
    Json(request): Json<WorkReviewRequest>,
) -> ApiResult<Json<Procurement>> {
    let actor = state.membership.profile(user.id).await?;
    let procurement = state
        .procurements
        .review_work(&actor, procurement_id, request)
        .await?;
    Ok(Json(procurement))
}
