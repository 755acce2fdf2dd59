//! Procurement Data Structures
//!
//! A procurement request mirrors the ticket shape with its own status set
//! and a monetary proposal (amount, currency, file reference) filled in by
//! the provider and reviewed by the recipient organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Currency a cleared proposal falls back to.
pub const DEFAULT_PROPOSAL_CURRENCY: &str = "EUR";

/// Procurement lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcurementStatus {
    New,
    Open,
    InProgress,
    /// A proposal is on the table; set by the dedicated submission operation
    ProposalSubmitted,
    Accepted,
    Rejected,
    WorkInProgress,
    /// Awaiting acceptance by the recipient organization; not terminal
    WorkFinished,
    Closed,
}

impl ProcurementStatus {
    /// String form used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcurementStatus::New => "new",
            ProcurementStatus::Open => "open",
            ProcurementStatus::InProgress => "inProgress",
            ProcurementStatus::ProposalSubmitted => "proposalSubmitted",
            ProcurementStatus::Accepted => "accepted",
            ProcurementStatus::Rejected => "rejected",
            ProcurementStatus::WorkInProgress => "workInProgress",
            ProcurementStatus::WorkFinished => "workFinished",
            ProcurementStatus::Closed => "closed",
        }
    }

    /// Parse from the database string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(ProcurementStatus::New),
            "open" => Some(ProcurementStatus::Open),
            "inProgress" => Some(ProcurementStatus::InProgress),
            "proposalSubmitted" => Some(ProcurementStatus::ProposalSubmitted),
            "accepted" => Some(ProcurementStatus::Accepted),
            "rejected" => Some(ProcurementStatus::Rejected),
            "workInProgress" => Some(ProcurementStatus::WorkInProgress),
            "workFinished" => Some(ProcurementStatus::WorkFinished),
            "closed" => Some(ProcurementStatus::Closed),
            _ => None,
        }
    }

    /// All statuses, for table-exhaustiveness tests
    pub fn all() -> [ProcurementStatus; 9] {
        [
            ProcurementStatus::New,
            ProcurementStatus::Open,
            ProcurementStatus::InProgress,
            ProcurementStatus::ProposalSubmitted,
            ProcurementStatus::Accepted,
            ProcurementStatus::Rejected,
            ProcurementStatus::WorkInProgress,
            ProcurementStatus::WorkFinished,
            ProcurementStatus::Closed,
        ]
    }
}

/// Represents a procurement request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procurement {
    pub id: Uuid,
    pub project_id: Uuid,
    pub created_by: Uuid,
    pub recipient_id: Uuid,
    /// Conversation visible to the requesting party
    pub external_conversation_id: Uuid,
    /// Provider-only back-channel (always exists, may be empty)
    pub internal_conversation_id: Uuid,
    pub status: ProcurementStatus,
    pub status_updated_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    /// Set when the recipient accepts the finished work
    pub rating: Option<i16>,
    /// Proposal amount in minor units; 0 when no proposal is on the table
    pub proposal_amount_cents: i64,
    pub proposal_currency: String,
    /// Opaque content-addressed reference to the proposal document
    pub proposal_file_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Procurement {
    /// Whether a proposal is currently filled in
    pub fn has_proposal(&self) -> bool {
        self.proposal_amount_cents != 0 || self.proposal_file_ref.is_some()
    }
}

/// Request to create a procurement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProcurementRequest {
    pub project_id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Request to move a procurement along the generic transition table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementStatusRequest {
    pub status: ProcurementStatus,
    #[serde(default)]
    pub reason: Option<String>,
    /// Rating carried by the proposalSubmitted -> accepted transition
    #[serde(default)]
    pub rating: Option<i16>,
}

/// Proposal submission; a distinct operation, not a generic status update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitProposalRequest {
    pub amount_cents: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub file_ref: Option<String>,
    /// Extra addresses cc'd on the proposal email
    #[serde(default)]
    pub cc: Vec<String>,
}

/// Recipient-side review of finished work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkReviewRequest {
    pub accept: bool,
    /// Required when accepting
    #[serde(default)]
    pub rating: Option<i16>,
    #[serde(default)]
    pub reason: Option<String>,
}
