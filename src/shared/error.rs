//! Core Error Taxonomy
//!
//! This module defines the domain error types shared by every service in the
//! backend. The HTTP projection (status codes, JSON body) lives in
//! `backend::error`; code in `shared` and the service layer only ever deals
//! with these variants.
//!
//! # Error Categories
//!
//! - `NotFound` - a case/conversation/message/user is absent; surfaced to the
//!   caller, never retried
//! - `Forbidden` - the actor lacks organization/role standing for the action
//! - `InvalidTransition` - a status change not in the allowed table, or a
//!   required companion field is missing; carries a machine-readable code
//! - `Constraint` - membership/integrity rules (forbidden role in an external
//!   chat, last same-org internal participant, foreign-key "in use")
//! - `Upstream` - push gateway / mail relay failures, logged but never
//!   surfaced to the triggering request
//! - `Database` - anything sqlx reports that is not one of the above

use thiserror::Error;

/// Machine-readable reason codes carried by `InvalidTransition` and
/// `Constraint` errors. Clients branch on these, so the strings are part of
/// the wire contract.
pub mod codes {
    pub const STATUS_NOT_ALLOWED: &str = "statusNotAllowed";
    pub const DUE_DATE_REQUIRED: &str = "dueDateRequired";
    pub const PROPOSAL_NOT_OPEN: &str = "proposalNotOpen";
    pub const ROLE_FORBIDDEN_IN_EXTERNAL_CHAT: &str = "roleForbiddenInExternalChat";
    pub const LAST_ORG_PARTICIPANT: &str = "lastOrgParticipant";
    pub const CASE_BOUND_CONVERSATION: &str = "caseBoundConversation";
    pub const IN_USE: &str = "inUse";
}

/// Result alias used throughout the service and store layers.
pub type CoreResult<T> = Result<T, CoreError>;

/// Domain error for the case-management and messaging core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The named entity does not exist (or is not visible to the caller).
    #[error("{what} not found")]
    NotFound {
        /// What was being looked up ("ticket", "chat", "message", ...)
        what: &'static str,
    },

    /// The actor has no standing for the requested action.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Human-readable reason
        reason: String,
    },

    /// A status change outside the transition table, or a transition whose
    /// required companion field is missing.
    #[error("invalid transition ({code}): {message}")]
    InvalidTransition {
        /// Machine-readable reason code (see [`codes`])
        code: &'static str,
        /// Human-readable message
        message: String,
    },

    /// A membership or integrity rule was violated.
    #[error("constraint violation ({code}): {message}")]
    Constraint {
        /// Machine-readable reason code (see [`codes`])
        code: &'static str,
        /// Human-readable message
        message: String,
    },

    /// An external collaborator (push gateway, mail relay) failed. These are
    /// logged by the dispatch paths and never surfaced to the request that
    /// triggered them.
    #[error("upstream error: {message}")]
    Upstream {
        /// Human-readable message
        message: String,
    },

    /// Underlying storage failure.
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl CoreError {
    /// Create a new not-found error for the given entity name.
    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound { what }
    }

    /// Create a new forbidden error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Create a new invalid-transition error with a reason code.
    pub fn invalid_transition(code: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidTransition {
            code,
            message: message.into(),
        }
    }

    /// Create a new constraint-violation error with a reason code.
    pub fn constraint(code: &'static str, message: impl Into<String>) -> Self {
        Self::Constraint {
            code,
            message: message.into(),
        }
    }

    /// Create a new upstream-collaborator error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// The machine-readable code for this error, if it carries one.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidTransition { code, .. } | Self::Constraint { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    /// Map storage errors into the taxonomy. A foreign-key violation
    /// (SQLSTATE 23503) becomes the user-facing "in use" constraint error so
    /// a delete of a referenced row is distinct from a generic failure.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return Self::not_found("record");
        }
        if let Some(db_err) = err.as_database_error() {
            if db_err.code().as_deref() == Some("23503") {
                return Self::constraint(codes::IN_USE, "cannot delete, record is in use");
            }
        }
        Self::Database(err)
    }
}
