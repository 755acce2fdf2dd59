//! Message Data Structure
//!
//! Messages are append-mostly: immutable once created, except for soft
//! deletion. Ordering is by creation time with ties broken by id, and the
//! id sequence is the authority for unread counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminates user text from the system event kinds posted by state
/// transitions and membership changes. The string forms are the original
/// wire names and are stored verbatim in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// Plain user text
    Text,
    // Ticket lifecycle
    UserNewTicket,
    TicketOpened,
    TicketOnHold,
    TicketReopened,
    TicketResolved,
    TicketAccepted,
    TicketRejected,
    TicketClosed,
    SystemTicketClosed,
    // Procurement lifecycle
    UserNewProcurement,
    ProcurementOpened,
    ProcurementInProgress,
    ProposalSubmitted,
    ProposalCanceled,
    ProcurementAccepted,
    ProcurementRejected,
    ProcurementWorkInProgress,
    ProcurementWorkFinished,
    ProcurementClosed,
    SystemProcurementClosed,
    // Membership and audit events
    ParticipantJoined,
    ParticipantLeft,
    MessageDeleted,
    /// Generic status-change fallback
    StatusChanged,
}

impl MessageKind {
    /// Wire/database string form
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::UserNewTicket => "userNewTicket",
            MessageKind::TicketOpened => "ticketOpened",
            MessageKind::TicketOnHold => "ticketOnHold",
            MessageKind::TicketReopened => "ticketReopened",
            MessageKind::TicketResolved => "ticketResolved",
            MessageKind::TicketAccepted => "ticketAccepted",
            MessageKind::TicketRejected => "ticketRejected",
            MessageKind::TicketClosed => "ticketClosed",
            MessageKind::SystemTicketClosed => "systemTicketClosed",
            MessageKind::UserNewProcurement => "userNewProcurement",
            MessageKind::ProcurementOpened => "procurementOpened",
            MessageKind::ProcurementInProgress => "procurementInProgress",
            MessageKind::ProposalSubmitted => "proposalSubmitted",
            MessageKind::ProposalCanceled => "proposalCanceled",
            MessageKind::ProcurementAccepted => "procurementAccepted",
            MessageKind::ProcurementRejected => "procurementRejected",
            MessageKind::ProcurementWorkInProgress => "procurementWorkInProgress",
            MessageKind::ProcurementWorkFinished => "procurementWorkFinished",
            MessageKind::ProcurementClosed => "procurementClosed",
            MessageKind::SystemProcurementClosed => "systemProcurementClosed",
            MessageKind::ParticipantJoined => "participantJoined",
            MessageKind::ParticipantLeft => "participantLeft",
            MessageKind::MessageDeleted => "messageDeleted",
            MessageKind::StatusChanged => "statusChanged",
        }
    }

    /// Parse from the wire/database string form
    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s {
            "text" => MessageKind::Text,
            "userNewTicket" => MessageKind::UserNewTicket,
            "ticketOpened" => MessageKind::TicketOpened,
            "ticketOnHold" => MessageKind::TicketOnHold,
            "ticketReopened" => MessageKind::TicketReopened,
            "ticketResolved" => MessageKind::TicketResolved,
            "ticketAccepted" => MessageKind::TicketAccepted,
            "ticketRejected" => MessageKind::TicketRejected,
            "ticketClosed" => MessageKind::TicketClosed,
            "systemTicketClosed" => MessageKind::SystemTicketClosed,
            "userNewProcurement" => MessageKind::UserNewProcurement,
            "procurementOpened" => MessageKind::ProcurementOpened,
            "procurementInProgress" => MessageKind::ProcurementInProgress,
            "proposalSubmitted" => MessageKind::ProposalSubmitted,
            "proposalCanceled" => MessageKind::ProposalCanceled,
            "procurementAccepted" => MessageKind::ProcurementAccepted,
            "procurementRejected" => MessageKind::ProcurementRejected,
            "procurementWorkInProgress" => MessageKind::ProcurementWorkInProgress,
            "procurementWorkFinished" => MessageKind::ProcurementWorkFinished,
            "procurementClosed" => MessageKind::ProcurementClosed,
            "systemProcurementClosed" => MessageKind::SystemProcurementClosed,
            "participantJoined" => MessageKind::ParticipantJoined,
            "participantLeft" => MessageKind::ParticipantLeft,
            "messageDeleted" => MessageKind::MessageDeleted,
            "statusChanged" => MessageKind::StatusChanged,
            _ => return None,
        };
        Some(kind)
    }

    /// Everything except `Text` is a system event kind
    pub fn is_system(&self) -> bool {
        !matches!(self, MessageKind::Text)
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Text
    }
}

/// Represents a message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Monotonic message id (sequence-assigned)
    pub id: i64,
    /// Conversation this message belongs to
    pub conversation_id: Uuid,
    /// Author; `None` means the message is system-generated
    pub author_id: Option<Uuid>,
    /// User text or system event kind
    pub kind: MessageKind,
    /// Body text
    pub body: String,
    /// Opaque content-addressed attachment references
    pub attachments: Vec<String>,
    /// Free-form event payload
    pub metadata: serde_json::Value,
    /// When the message was created
    pub created_at: DateTime<Utc>,
    /// Soft-delete timestamp; the row is never removed
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Message {
    /// System-generated messages have no author
    pub fn is_system(&self) -> bool {
        self.author_id.is_none()
    }

    /// Soft-deleted messages stay in the thread as tombstones
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Request to post a user message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessageRequest {
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Paging parameters for message listing
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListMessagesQuery {
    /// Only messages with an id strictly greater than this
    #[serde(default)]
    pub after_id: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// One page of a conversation's history, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    /// Total matching messages, independent of paging
    pub total: i64,
}

/// Request to advance the caller's read marker
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarkReadRequest {
    pub message_id: i64,
}
