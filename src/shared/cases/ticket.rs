//! Ticket Data Structures
//!
//! A support ticket is one of the two case types driving the dual-channel
//! conversation model. Status strings are stored verbatim in the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ticket lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TicketStatus {
    New,
    Open,
    OnHold,
    /// Pending acceptance by the recipient organization; not terminal
    Resolved,
    Closed,
}

impl TicketStatus {
    /// String form used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::Open => "open",
            TicketStatus::OnHold => "onHold",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    /// Parse from the database string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(TicketStatus::New),
            "open" => Some(TicketStatus::Open),
            "onHold" => Some(TicketStatus::OnHold),
            "resolved" => Some(TicketStatus::Resolved),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }

    /// All statuses, for table-exhaustiveness tests
    pub fn all() -> [TicketStatus; 5] {
        [
            TicketStatus::New,
            TicketStatus::Open,
            TicketStatus::OnHold,
            TicketStatus::Resolved,
            TicketStatus::Closed,
        ]
    }
}

/// Ticket priority. Changing it requires a due date but is not a status
/// transition and posts no chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TicketPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Normal => "normal",
            TicketPriority::High => "high",
            TicketPriority::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(TicketPriority::Low),
            "normal" => Some(TicketPriority::Normal),
            "high" => Some(TicketPriority::High),
            "critical" => Some(TicketPriority::Critical),
            _ => None,
        }
    }
}

/// Represents a support ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub project_id: Uuid,
    pub created_by: Uuid,
    pub recipient_id: Uuid,
    /// Conversation visible to the requesting party
    pub external_conversation_id: Uuid,
    /// Provider-only back-channel (always exists, may be empty)
    pub internal_conversation_id: Uuid,
    pub status: TicketStatus,
    pub status_updated_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub due_date: Option<DateTime<Utc>>,
    /// Set on the first new -> open transition
    pub opened_at: Option<DateTime<Utc>>,
    /// Set when the ticket goes on hold; basis for due-date recomputation
    pub on_hold_at: Option<DateTime<Utc>>,
    /// Set when the recipient accepts the resolution
    pub rating: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTicketRequest {
    pub project_id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: Option<TicketPriority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Request to move a ticket along the generic transition table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketStatusRequest {
    pub status: TicketStatus,
    /// Free-text reason, carried in the system message body where the
    /// transition specifies one (resolution, closing)
    #[serde(default)]
    pub reason: Option<String>,
}

/// Recipient-side review of a resolved ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionReviewRequest {
    pub accept: bool,
    /// Required when accepting
    #[serde(default)]
    pub rating: Option<i16>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Priority change; the due date is a required companion field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketPriorityRequest {
    pub priority: TicketPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}
