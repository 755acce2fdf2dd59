//! Conversation and Participant Data Structures
//!
//! A conversation is a thread of messages shared by a set of participants.
//! Case-bound conversations (external/internal) are created together with
//! their case and never change kind; direct/group/channel chats are created
//! ad hoc.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of conversation. Fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversationKind {
    /// Case channel visible to the requesting party (creator, recipient,
    /// assigned provider staff)
    External,
    /// Provider-only back-channel of a case
    Internal,
    /// Ad-hoc one-to-one chat
    Direct,
    /// Ad-hoc multi-user chat
    Group,
    /// Broadcast channel (announcements)
    Channel,
}

impl ConversationKind {
    /// String form used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationKind::External => "external",
            ConversationKind::Internal => "internal",
            ConversationKind::Direct => "direct",
            ConversationKind::Group => "group",
            ConversationKind::Channel => "channel",
        }
    }

    /// Parse from the database string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "external" => Some(ConversationKind::External),
            "internal" => Some(ConversationKind::Internal),
            "direct" => Some(ConversationKind::Direct),
            "group" => Some(ConversationKind::Group),
            "channel" => Some(ConversationKind::Channel),
            _ => None,
        }
    }

    /// Case-bound conversations are governed by the membership policy;
    /// ad-hoc chats are not.
    pub fn is_case_bound(&self) -> bool {
        matches!(self, ConversationKind::External | ConversationKind::Internal)
    }
}

/// Represents a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: Uuid,
    /// Kind, fixed at creation
    pub kind: ConversationKind,
    /// Optional display title
    pub title: Option<String>,
    /// Optional avatar file reference (opaque, content-addressed)
    pub avatar_ref: Option<String>,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
}

/// Display-only participant role. Never consulted for access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParticipantRole {
    Owner,
    Admin,
    Participant,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Owner => "owner",
            ParticipantRole::Admin => "admin",
            ParticipantRole::Participant => "participant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(ParticipantRole::Owner),
            "admin" => Some(ParticipantRole::Admin),
            "participant" => Some(ParticipantRole::Participant),
            _ => None,
        }
    }
}

/// A user's membership in a conversation.
///
/// Participants are soft-removed (the `active` flag) so message history keeps
/// its authors; re-adding reactivates the same row. The `read_marker` is the
/// highest message id the participant has acknowledged and is the sole
/// source of unread counts: unread = messages with `id > read_marker`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub active: bool,
    /// Display role shown by clients
    pub role: Option<ParticipantRole>,
    /// Highest acknowledged message id; never decreases
    pub read_marker: i64,
    pub joined_at: DateTime<Utc>,
}

/// Request to create an ad-hoc conversation (direct/group/channel)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConversationRequest {
    pub kind: ConversationKind,
    /// Initial participants; the creator is always included
    pub participant_ids: Vec<Uuid>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Request to add a participant to a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddParticipantRequest {
    pub user_id: Uuid,
}

/// Per-conversation unread total for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCount {
    pub conversation_id: Uuid,
    pub unread: i64,
}
