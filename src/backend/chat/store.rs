//! Database operations for the conversation store
//!
//! Conversations, participants and messages. Every function takes a
//! `&mut PgConnection` so callers can run them on a pool connection or
//! compose them into a transaction (see `backend::uow`). No business policy
//! lives here: eligibility checks are the membership engine's job.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::shared::chat::{Conversation, ConversationKind, Message, MessageKind, Participant};
use crate::shared::error::{CoreError, CoreResult};

fn conversation_from_row(row: &sqlx::postgres::PgRow) -> Conversation {
    let kind_str: String = row.get("kind");
    Conversation {
        id: row.get("id"),
        kind: ConversationKind::parse(&kind_str).unwrap_or(ConversationKind::Group),
        title: row.get("title"),
        avatar_ref: row.get("avatar_ref"),
        created_at: row.get("created_at"),
    }
}

fn participant_from_row(row: &sqlx::postgres::PgRow) -> Participant {
    let role: Option<String> = row.get("role");
    Participant {
        conversation_id: row.get("conversation_id"),
        user_id: row.get("user_id"),
        active: row.get("active"),
        role: role.as_deref().and_then(crate::shared::chat::ParticipantRole::parse),
        read_marker: row.get("read_marker"),
        joined_at: row.get("joined_at"),
    }
}

fn message_from_row(row: &sqlx::postgres::PgRow) -> Message {
    let kind_str: String = row.get("kind");
    Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        author_id: row.get("author_id"),
        kind: MessageKind::parse(&kind_str).unwrap_or_default(),
        body: row.get("body"),
        attachments: Vec::new(),
        metadata: row.get("metadata"),
        created_at: row.get("created_at"),
        deleted_at: row.get("deleted_at"),
    }
}

/// Collapse attachment-join fan-out: consecutive rows sharing one message id
/// become a single message carrying all its file refs.
fn collapse_attachment_rows(rows: Vec<(Message, Option<String>)>) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::with_capacity(rows.len());
    for (message, file_ref) in rows {
        match messages.last_mut() {
            Some(last) if last.id == message.id => {
                if let Some(file_ref) = file_ref {
                    last.attachments.push(file_ref);
                }
            }
            _ => {
                let mut message = message;
                if let Some(file_ref) = file_ref {
                    message.attachments.push(file_ref);
                }
                messages.push(message);
            }
        }
    }
    messages
}

/// Create a conversation with one active participant per id.
///
/// Participant ids are deduplicated; eligibility is the caller's job. No
/// "joined" messages are posted for the initial set.
pub async fn create_conversation(
    conn: &mut PgConnection,
    kind: ConversationKind,
    initial_participants: &[Uuid],
    title: Option<&str>,
) -> CoreResult<Conversation> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO conversations (id, kind, title, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(kind.as_str())
    .bind(title)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let mut seen: Vec<Uuid> = Vec::with_capacity(initial_participants.len());
    for user_id in initial_participants {
        if seen.contains(user_id) {
            continue;
        }
        seen.push(*user_id);

        sqlx::query(
            r#"
            INSERT INTO conversation_participants (conversation_id, user_id, active, joined_at)
            VALUES ($1, $2, TRUE, $3)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    Ok(Conversation {
        id,
        kind,
        title: title.map(|t| t.to_string()),
        avatar_ref: None,
        created_at: now,
    })
}

/// Fetch a conversation or fail with NotFound.
pub async fn get_conversation(conn: &mut PgConnection, id: Uuid) -> CoreResult<Conversation> {
    let row = sqlx::query(
        r#"
        SELECT id, kind, title, avatar_ref, created_at
        FROM conversations
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref()
        .map(conversation_from_row)
        .ok_or(CoreError::not_found("chat"))
}

/// Conversations the user is an active participant of, newest first.
pub async fn conversations_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> CoreResult<Vec<Conversation>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.kind, c.title, c.avatar_ref, c.created_at
        FROM conversations c
        JOIN conversation_participants p ON p.conversation_id = c.id
        WHERE p.user_id = $1 AND p.active = TRUE
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(conversation_from_row).collect())
}

/// Append a message.
///
/// `author` is None for system-generated messages, which may be posted even
/// when the author is no longer (or never was) a participant.
pub async fn post_message(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    author_id: Option<Uuid>,
    kind: MessageKind,
    body: &str,
    attachments: &[String],
    metadata: serde_json::Value,
) -> CoreResult<Message> {
    // Explicit existence check so the caller sees NotFound, not an FK error.
    get_conversation(&mut *conn, conversation_id).await?;

    let row = sqlx::query(
        r#"
        INSERT INTO messages (conversation_id, author_id, kind, body, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING id, conversation_id, author_id, kind, body, metadata, created_at, deleted_at
        "#,
    )
    .bind(conversation_id)
    .bind(author_id)
    .bind(kind.as_str())
    .bind(body)
    .bind(&metadata)
    .fetch_one(&mut *conn)
    .await?;

    let mut message = message_from_row(&row);

    for file_ref in attachments {
        sqlx::query(
            r#"
            INSERT INTO message_attachments (message_id, file_ref)
            VALUES ($1, $2)
            ON CONFLICT (message_id, file_ref) DO NOTHING
            "#,
        )
        .bind(message.id)
        .bind(file_ref)
        .execute(&mut *conn)
        .await?;
        message.attachments.push(file_ref.clone());
    }

    Ok(message)
}

/// List a page of messages: `(total, messages)`.
///
/// The page is selected newest-first (stable pagination: `created_at` then
/// id) and normalized to chronological order before returning. The
/// attachment join fans out one row per file ref; rows are collapsed by
/// message id.
pub async fn list_messages(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    since_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> CoreResult<(i64, Vec<Message>)> {
    get_conversation(&mut *conn, conversation_id).await?;

    let total: i64 = sqlx::query(
        r#"
        SELECT COUNT(*) AS total
        FROM messages
        WHERE conversation_id = $1 AND ($2::BIGINT IS NULL OR id > $2)
        "#,
    )
    .bind(conversation_id)
    .bind(since_id)
    .fetch_one(&mut *conn)
    .await?
    .get("total");

    let rows = sqlx::query(
        r#"
        SELECT m.id, m.conversation_id, m.author_id, m.kind, m.body, m.metadata,
               m.created_at, m.deleted_at, a.file_ref
        FROM (
            SELECT id, conversation_id, author_id, kind, body, metadata, created_at, deleted_at
            FROM messages
            WHERE conversation_id = $1 AND ($2::BIGINT IS NULL OR id > $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
        ) m
        LEFT JOIN message_attachments a ON a.message_id = m.id
        ORDER BY m.created_at DESC, m.id DESC
        "#,
    )
    .bind(conversation_id)
    .bind(since_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;

    let pairs: Vec<(Message, Option<String>)> = rows
        .iter()
        .map(|row| (message_from_row(row), row.get("file_ref")))
        .collect();

    let mut messages = collapse_attachment_rows(pairs);
    messages.reverse();

    Ok((total, messages))
}

/// Fetch one message (with attachments) or fail with NotFound.
pub async fn get_message(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    message_id: i64,
) -> CoreResult<Message> {
    let rows = sqlx::query(
        r#"
        SELECT m.id, m.conversation_id, m.author_id, m.kind, m.body, m.metadata,
               m.created_at, m.deleted_at, a.file_ref
        FROM messages m
        LEFT JOIN message_attachments a ON a.message_id = m.id
        WHERE m.id = $1 AND m.conversation_id = $2
        "#,
    )
    .bind(message_id)
    .bind(conversation_id)
    .fetch_all(&mut *conn)
    .await?;

    let pairs: Vec<(Message, Option<String>)> = rows
        .iter()
        .map(|row| (message_from_row(row), row.get("file_ref")))
        .collect();

    collapse_attachment_rows(pairs)
        .into_iter()
        .next()
        .ok_or(CoreError::not_found("message"))
}

/// Soft-delete a message. Returns the deleted message, or NotFound when it
/// does not exist or is already deleted. Callers pair this with the audit
/// message inside one transaction.
pub async fn soft_delete_message(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    message_id: i64,
) -> CoreResult<Message> {
    let row = sqlx::query(
        r#"
        UPDATE messages
        SET deleted_at = NOW()
        WHERE id = $1 AND conversation_id = $2 AND deleted_at IS NULL
        RETURNING id, conversation_id, author_id, kind, body, metadata, created_at, deleted_at
        "#,
    )
    .bind(message_id)
    .bind(conversation_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref()
        .map(message_from_row)
        .ok_or(CoreError::not_found("message"))
}

/// Fetch a participant row, active or not.
pub async fn get_participant(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    user_id: Uuid,
) -> CoreResult<Option<Participant>> {
    let row = sqlx::query(
        r#"
        SELECT conversation_id, user_id, active, role, read_marker, joined_at
        FROM conversation_participants
        WHERE conversation_id = $1 AND user_id = $2
        "#,
    )
    .bind(conversation_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.as_ref().map(participant_from_row))
}

/// All active participants of a conversation.
pub async fn active_participants(
    conn: &mut PgConnection,
    conversation_id: Uuid,
) -> CoreResult<Vec<Participant>> {
    let rows = sqlx::query(
        r#"
        SELECT conversation_id, user_id, active, role, read_marker, joined_at
        FROM conversation_participants
        WHERE conversation_id = $1 AND active = TRUE
        ORDER BY joined_at
        "#,
    )
    .bind(conversation_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(participant_from_row).collect())
}

/// Advance a participant's read marker; never regresses.
///
/// An older (or equal) message id is a no-op. A missing participant row is
/// NotFound.
pub async fn mark_read(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    user_id: Uuid,
    message_id: i64,
) -> CoreResult<()> {
    get_participant(&mut *conn, conversation_id, user_id)
        .await?
        .ok_or(CoreError::not_found("participant"))?;

    sqlx::query(
        r#"
        UPDATE conversation_participants
        SET read_marker = $3
        WHERE conversation_id = $1 AND user_id = $2 AND read_marker < $3
        "#,
    )
    .bind(conversation_id)
    .bind(user_id)
    .bind(message_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Unread counts for the conversations the user is active in.
///
/// One aggregate query; count = messages with id greater than the
/// participant's read marker. Conversations the user is not active in are
/// absent from the result.
pub async fn unread_counts(
    conn: &mut PgConnection,
    user_id: Uuid,
    conversation_ids: &[Uuid],
) -> CoreResult<HashMap<Uuid, i64>> {
    let rows = sqlx::query(
        r#"
        SELECT p.conversation_id, COUNT(m.id) AS unread
        FROM conversation_participants p
        LEFT JOIN messages m
            ON m.conversation_id = p.conversation_id AND m.id > p.read_marker
        WHERE p.user_id = $1 AND p.active = TRUE AND p.conversation_id = ANY($2)
        GROUP BY p.conversation_id
        "#,
    )
    .bind(user_id)
    .bind(conversation_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("conversation_id"), row.get("unread")))
        .collect())
}

/// Activate or deactivate a participant.
///
/// Reactivation reuses the existing row and keeps its `read_marker`; a
/// first-time add creates the row. The state change itself appends the
/// "joined"/"left" system message — an add that changes nothing (already
/// active, or deactivating an inactive row) returns the existing record and
/// posts nothing.
pub async fn set_participant_active(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    user_id: Uuid,
    active: bool,
) -> CoreResult<Participant> {
    get_conversation(&mut *conn, conversation_id).await?;

    let existing = get_participant(&mut *conn, conversation_id, user_id).await?;

    let participant = match existing {
        Some(participant) if participant.active == active => return Ok(participant),
        Some(mut participant) => {
            sqlx::query(
                r#"
                UPDATE conversation_participants
                SET active = $3
                WHERE conversation_id = $1 AND user_id = $2
                "#,
            )
            .bind(conversation_id)
            .bind(user_id)
            .bind(active)
            .execute(&mut *conn)
            .await?;
            participant.active = active;
            participant
        }
        None if active => {
            let now = Utc::now();
            sqlx::query(
                r#"
                INSERT INTO conversation_participants (conversation_id, user_id, active, joined_at)
                VALUES ($1, $2, TRUE, $3)
                "#,
            )
            .bind(conversation_id)
            .bind(user_id)
            .bind(now)
            .execute(&mut *conn)
            .await?;
            Participant {
                conversation_id,
                user_id,
                active: true,
                role: None,
                read_marker: 0,
                joined_at: now,
            }
        }
        None => return Err(CoreError::not_found("participant")),
    };

    let kind = if active {
        MessageKind::ParticipantJoined
    } else {
        MessageKind::ParticipantLeft
    };
    post_message(
        &mut *conn,
        conversation_id,
        None,
        kind,
        "",
        &[],
        serde_json::json!({ "userId": user_id }),
    )
    .await?;

    Ok(participant)
}
