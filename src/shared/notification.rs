//! Notification Data Structures
//!
//! Notifications are written after a case transition commits and delivered
//! out of band (push). Delivery failures never reach the request that
//! triggered them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    CaseOpened,
    TicketStatusChanged,
    ProcurementStatusChanged,
    ProposalSubmitted,
}

impl NotificationKind {
    /// String form used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::CaseOpened => "caseOpened",
            NotificationKind::TicketStatusChanged => "ticketStatusChanged",
            NotificationKind::ProcurementStatusChanged => "procurementStatusChanged",
            NotificationKind::ProposalSubmitted => "proposalSubmitted",
        }
    }

    /// Parse from the database string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "caseOpened" => Some(NotificationKind::CaseOpened),
            "ticketStatusChanged" => Some(NotificationKind::TicketStatusChanged),
            "procurementStatusChanged" => Some(NotificationKind::ProcurementStatusChanged),
            "proposalSubmitted" => Some(NotificationKind::ProposalSubmitted),
            _ => None,
        }
    }
}

/// A stored notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    /// Case metadata: previous/next status, case id, project id
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}
