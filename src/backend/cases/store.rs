//! Database operations for tickets and procurements
//!
//! Same shape as the conversation store: `&mut PgConnection` everywhere so
//! case writes compose into the unit of work. Status changes persist through
//! a conditional update (`WHERE status = expected`) — the case row is the
//! serialization point between concurrent transitions, and a lost race
//! surfaces as a conflict instead of a silent overwrite.

use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::shared::cases::{
    Procurement, ProcurementStatus, Ticket, TicketPriority, TicketStatus,
};
use crate::shared::error::{codes, CoreError, CoreResult};

fn ticket_from_row(row: &sqlx::postgres::PgRow) -> Ticket {
    let status: String = row.get("status");
    let priority: String = row.get("priority");
    Ticket {
        id: row.get("id"),
        project_id: row.get("project_id"),
        created_by: row.get("created_by"),
        recipient_id: row.get("recipient_id"),
        external_conversation_id: row.get("external_conversation_id"),
        internal_conversation_id: row.get("internal_conversation_id"),
        status: TicketStatus::parse(&status).unwrap_or(TicketStatus::New),
        status_updated_at: row.get("status_updated_at"),
        title: row.get("title"),
        description: row.get("description"),
        priority: TicketPriority::parse(&priority).unwrap_or(TicketPriority::Normal),
        due_date: row.get("due_date"),
        opened_at: row.get("opened_at"),
        on_hold_at: row.get("on_hold_at"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn procurement_from_row(row: &sqlx::postgres::PgRow) -> Procurement {
    let status: String = row.get("status");
    Procurement {
        id: row.get("id"),
        project_id: row.get("project_id"),
        created_by: row.get("created_by"),
        recipient_id: row.get("recipient_id"),
        external_conversation_id: row.get("external_conversation_id"),
        internal_conversation_id: row.get("internal_conversation_id"),
        status: ProcurementStatus::parse(&status).unwrap_or(ProcurementStatus::New),
        status_updated_at: row.get("status_updated_at"),
        title: row.get("title"),
        description: row.get("description"),
        due_date: row.get("due_date"),
        rating: row.get("rating"),
        proposal_amount_cents: row.get("proposal_amount_cents"),
        proposal_currency: row.get("proposal_currency"),
        proposal_file_ref: row.get("proposal_file_ref"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const TICKET_COLUMNS: &str = r#"
    id, project_id, created_by, recipient_id,
    external_conversation_id, internal_conversation_id,
    status, status_updated_at, title, description, priority,
    due_date, opened_at, on_hold_at, rating, created_at, updated_at
"#;

const PROCUREMENT_COLUMNS: &str = r#"
    id, project_id, created_by, recipient_id,
    external_conversation_id, internal_conversation_id,
    status, status_updated_at, title, description,
    due_date, rating, proposal_amount_cents, proposal_currency,
    proposal_file_ref, created_at, updated_at
"#;

/// Insert a fully-built ticket row.
pub async fn insert_ticket(conn: &mut PgConnection, ticket: &Ticket) -> CoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tickets (
            id, project_id, created_by, recipient_id,
            external_conversation_id, internal_conversation_id,
            status, status_updated_at, title, description, priority,
            due_date, opened_at, on_hold_at, rating, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(ticket.id)
    .bind(ticket.project_id)
    .bind(ticket.created_by)
    .bind(ticket.recipient_id)
    .bind(ticket.external_conversation_id)
    .bind(ticket.internal_conversation_id)
    .bind(ticket.status.as_str())
    .bind(ticket.status_updated_at)
    .bind(&ticket.title)
    .bind(&ticket.description)
    .bind(ticket.priority.as_str())
    .bind(ticket.due_date)
    .bind(ticket.opened_at)
    .bind(ticket.on_hold_at)
    .bind(ticket.rating)
    .bind(ticket.created_at)
    .bind(ticket.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Fetch a ticket or fail with NotFound.
pub async fn get_ticket(conn: &mut PgConnection, id: Uuid) -> CoreResult<Ticket> {
    let row = sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref()
        .map(ticket_from_row)
        .ok_or(CoreError::not_found("ticket"))
}

/// Persist a ticket's post-transition state.
///
/// The update only applies while the row still holds `expected`; zero rows
/// means a concurrent transition won the race and this one is rejected.
pub async fn persist_ticket_transition(
    conn: &mut PgConnection,
    ticket: &Ticket,
    expected: TicketStatus,
) -> CoreResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE tickets
        SET status = $2, status_updated_at = $3, updated_at = $3,
            due_date = $4, opened_at = $5, on_hold_at = $6, rating = $7
        WHERE id = $1 AND status = $8
        "#,
    )
    .bind(ticket.id)
    .bind(ticket.status.as_str())
    .bind(ticket.status_updated_at)
    .bind(ticket.due_date)
    .bind(ticket.opened_at)
    .bind(ticket.on_hold_at)
    .bind(ticket.rating)
    .bind(expected.as_str())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::invalid_transition(
            codes::STATUS_NOT_ALLOWED,
            "ticket status changed concurrently",
        ));
    }

    Ok(())
}

/// Update a ticket's priority and due date. Not a status transition.
pub async fn update_ticket_priority(
    conn: &mut PgConnection,
    id: Uuid,
    priority: TicketPriority,
    due_date: chrono::DateTime<chrono::Utc>,
) -> CoreResult<Ticket> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE tickets
        SET priority = $2, due_date = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {TICKET_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(priority.as_str())
    .bind(due_date)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref()
        .map(ticket_from_row)
        .ok_or(CoreError::not_found("ticket"))
}

/// The ticket owning a conversation (external or internal), if any.
pub async fn ticket_by_conversation(
    conn: &mut PgConnection,
    conversation_id: Uuid,
) -> CoreResult<Option<Ticket>> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {TICKET_COLUMNS} FROM tickets
        WHERE external_conversation_id = $1 OR internal_conversation_id = $1
        "#
    ))
    .bind(conversation_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.as_ref().map(ticket_from_row))
}

/// Insert a fully-built procurement row.
pub async fn insert_procurement(
    conn: &mut PgConnection,
    procurement: &Procurement,
) -> CoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO procurements (
            id, project_id, created_by, recipient_id,
            external_conversation_id, internal_conversation_id,
            status, status_updated_at, title, description,
            due_date, rating, proposal_amount_cents, proposal_currency,
            proposal_file_ref, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(procurement.id)
    .bind(procurement.project_id)
    .bind(procurement.created_by)
    .bind(procurement.recipient_id)
    .bind(procurement.external_conversation_id)
    .bind(procurement.internal_conversation_id)
    .bind(procurement.status.as_str())
    .bind(procurement.status_updated_at)
    .bind(&procurement.title)
    .bind(&procurement.description)
    .bind(procurement.due_date)
    .bind(procurement.rating)
    .bind(procurement.proposal_amount_cents)
    .bind(&procurement.proposal_currency)
    .bind(&procurement.proposal_file_ref)
    .bind(procurement.created_at)
    .bind(procurement.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Fetch a procurement or fail with NotFound.
pub async fn get_procurement(conn: &mut PgConnection, id: Uuid) -> CoreResult<Procurement> {
    let row = sqlx::query(&format!(
        "SELECT {PROCUREMENT_COLUMNS} FROM procurements WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref()
        .map(procurement_from_row)
        .ok_or(CoreError::not_found("procurement"))
}

/// Persist a procurement's post-transition state (conditional on the
/// expected current status, like the ticket path).
pub async fn persist_procurement_transition(
    conn: &mut PgConnection,
    procurement: &Procurement,
    expected: ProcurementStatus,
) -> CoreResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE procurements
        SET status = $2, status_updated_at = $3, updated_at = $3,
            due_date = $4, rating = $5, proposal_amount_cents = $6,
            proposal_currency = $7, proposal_file_ref = $8
        WHERE id = $1 AND status = $9
        "#,
    )
    .bind(procurement.id)
    .bind(procurement.status.as_str())
    .bind(procurement.status_updated_at)
    .bind(procurement.due_date)
    .bind(procurement.rating)
    .bind(procurement.proposal_amount_cents)
    .bind(&procurement.proposal_currency)
    .bind(&procurement.proposal_file_ref)
    .bind(expected.as_str())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::invalid_transition(
            codes::STATUS_NOT_ALLOWED,
            "procurement status changed concurrently",
        ));
    }

    Ok(())
}

/// The procurement owning a conversation (external or internal), if any.
pub async fn procurement_by_conversation(
    conn: &mut PgConnection,
    conversation_id: Uuid,
) -> CoreResult<Option<Procurement>> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {PROCUREMENT_COLUMNS} FROM procurements
        WHERE external_conversation_id = $1 OR internal_conversation_id = $1
        "#
    ))
    .bind(conversation_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.as_ref().map(procurement_from_row))
}

/// Tickets sitting in `resolved` since before the cutoff.
pub async fn stale_resolved_tickets(
    conn: &mut PgConnection,
    cutoff: chrono::DateTime<chrono::Utc>,
) -> CoreResult<Vec<Uuid>> {
    let rows = sqlx::query(
        r#"
        SELECT id FROM tickets
        WHERE status = $1 AND status_updated_at < $2
        "#,
    )
    .bind(TicketStatus::Resolved.as_str())
    .bind(cutoff)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("id")).collect())
}

/// Procurements sitting in `workFinished` since before the cutoff.
pub async fn stale_finished_procurements(
    conn: &mut PgConnection,
    cutoff: chrono::DateTime<chrono::Utc>,
) -> CoreResult<Vec<Uuid>> {
    let rows = sqlx::query(
        r#"
        SELECT id FROM procurements
        WHERE status = $1 AND status_updated_at < $2
        "#,
    )
    .bind(ProcurementStatus::WorkFinished.as_str())
    .bind(cutoff)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("id")).collect())
}

/// Force-close one stale ticket if it is still resolved and still stale.
///
/// Returns the closed ticket, or None when a concurrent transition got
/// there first (the conditional update affected zero rows).
pub async fn close_stale_ticket(
    conn: &mut PgConnection,
    id: Uuid,
    cutoff: chrono::DateTime<chrono::Utc>,
    now: chrono::DateTime<chrono::Utc>,
) -> CoreResult<Option<Ticket>> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE tickets
        SET status = $2, status_updated_at = $3, updated_at = $3
        WHERE id = $1 AND status = $4 AND status_updated_at < $5
        RETURNING {TICKET_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(TicketStatus::Closed.as_str())
    .bind(now)
    .bind(TicketStatus::Resolved.as_str())
    .bind(cutoff)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.as_ref().map(ticket_from_row))
}

/// Force-close one stale procurement (same contract as the ticket path).
pub async fn close_stale_procurement(
    conn: &mut PgConnection,
    id: Uuid,
    cutoff: chrono::DateTime<chrono::Utc>,
    now: chrono::DateTime<chrono::Utc>,
) -> CoreResult<Option<Procurement>> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE procurements
        SET status = $2, status_updated_at = $3, updated_at = $3
        WHERE id = $1 AND status = $4 AND status_updated_at < $5
        RETURNING {PROCUREMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(ProcurementStatus::Closed.as_str())
    .bind(now)
    .bind(ProcurementStatus::WorkFinished.as_str())
    .bind(cutoff)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.as_ref().map(procurement_from_row))
}
