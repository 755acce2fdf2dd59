//! Transition tables for the case state machines
//!
//! One table per case type maps `(current, requested)` to a side-effect
//! descriptor: which system message to post (None for the quiet set), which
//! notification kind to fan out, and which fields to mutate. A pair absent
//! from the table is a rejected transition; requesting the current status is
//! always rejected. Everything in this module is pure so the whole table is
//! exhaustively testable.
//!
//! The recipient-side review steps (resolved and workFinished cases) are
//! deliberately not in the generic tables; they run through dedicated
//! operations with their own effect lookups.

use chrono::{DateTime, Utc};

use crate::shared::cases::{
    Procurement, ProcurementStatus, Ticket, TicketStatus, DEFAULT_PROPOSAL_CURRENCY,
};
use crate::shared::chat::MessageKind;
use crate::shared::notification::NotificationKind;

/// Side effects of an accepted ticket transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketEffect {
    /// System message for the external conversation; None = quiet
    pub message: Option<MessageKind>,
    /// Stamp `opened_at` (first new -> open)
    pub sets_opened_at: bool,
    /// Stamp `on_hold_at` (open -> onHold)
    pub sets_on_hold_at: bool,
    /// Preserve remaining time-to-due across the hold (onHold -> open)
    pub recomputes_due_date: bool,
}

/// Generic ticket transition table.
///
/// `resolved -> closed/open` is missing on purpose: those run through the
/// resolution review operation.
pub fn ticket_transition(from: TicketStatus, to: TicketStatus) -> Option<TicketEffect> {
    use TicketStatus::*;

    if from == to {
        return None;
    }

    let effect = match (from, to) {
        (New, Open) => TicketEffect {
            message: Some(MessageKind::TicketOpened),
            sets_opened_at: true,
            ..Default::default()
        },
        (Open, OnHold) => TicketEffect {
            message: Some(MessageKind::TicketOnHold),
            sets_on_hold_at: true,
            ..Default::default()
        },
        (OnHold, Open) => TicketEffect {
            message: Some(MessageKind::TicketReopened),
            recomputes_due_date: true,
            ..Default::default()
        },
        (Open, Resolved) => TicketEffect {
            message: Some(MessageKind::TicketResolved),
            ..Default::default()
        },
        (New, Closed) | (Open, Closed) | (OnHold, Closed) => TicketEffect {
            message: Some(MessageKind::TicketClosed),
            ..Default::default()
        },
        _ => return None,
    };

    Some(effect)
}

/// Apply a ticket effect's field mutations in place.
///
/// Reopening preserves the remaining time-to-due that existed when the
/// ticket went on hold: `new_due = now + (old_due - on_hold_at)`. Without a
/// due date (or a hold stamp) there is nothing to preserve.
pub fn apply_ticket_effect(
    ticket: &mut Ticket,
    to: TicketStatus,
    effect: &TicketEffect,
    now: DateTime<Utc>,
) {
    ticket.status = to;
    ticket.status_updated_at = now;
    ticket.updated_at = now;

    if effect.sets_opened_at {
        ticket.opened_at = Some(now);
    }
    if effect.sets_on_hold_at {
        ticket.on_hold_at = Some(now);
    }
    if effect.recomputes_due_date {
        if let (Some(due), Some(on_hold_at)) = (ticket.due_date, ticket.on_hold_at) {
            ticket.due_date = Some(now + (due - on_hold_at));
        }
        ticket.on_hold_at = None;
    }
}

/// Resolution review outcome: `(new status, system message)`.
///
/// Only valid on a `resolved` ticket; restricted to the recipient's
/// organization. Accepting also stores the supplied rating.
pub fn ticket_review_effect(accept: bool) -> (TicketStatus, MessageKind) {
    if accept {
        (TicketStatus::Closed, MessageKind::TicketAccepted)
    } else {
        (TicketStatus::Open, MessageKind::TicketRejected)
    }
}

/// Notification kind for any accepted ticket transition.
pub fn ticket_notification() -> NotificationKind {
    NotificationKind::TicketStatusChanged
}

/// Notification kind for the creation of either case type.
pub fn case_opened_notification() -> NotificationKind {
    NotificationKind::CaseOpened
}

/// Side effects of an accepted procurement transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcurementEffect {
    /// System message for the external conversation; None = quiet
    pub message: Option<MessageKind>,
    /// Cancel path: amount back to 0, currency to default, file cleared
    pub resets_proposal: bool,
    /// Accept path: store the supplied rating
    pub carries_rating: bool,
}

/// Generic procurement transition table.
///
/// The quiet set is exactly `{open -> inProgress, rejected -> open}`.
/// `workFinished` leaves only via the work review operation or the sweep,
/// and proposal submission is its own operation, so neither appears here.
pub fn procurement_transition(
    from: ProcurementStatus,
    to: ProcurementStatus,
) -> Option<ProcurementEffect> {
    use ProcurementStatus::*;

    if from == to {
        return None;
    }

    let effect = match (from, to) {
        (New, Open) => ProcurementEffect {
            message: Some(MessageKind::ProcurementOpened),
            ..Default::default()
        },
        (Open, InProgress) | (Rejected, Open) => ProcurementEffect {
            message: None,
            ..Default::default()
        },
        (ProposalSubmitted, Open) => ProcurementEffect {
            message: Some(MessageKind::ProposalCanceled),
            resets_proposal: true,
            ..Default::default()
        },
        (ProposalSubmitted, Accepted) => ProcurementEffect {
            message: Some(MessageKind::ProcurementAccepted),
            carries_rating: true,
            ..Default::default()
        },
        (ProposalSubmitted, Rejected) => ProcurementEffect {
            message: Some(MessageKind::ProcurementRejected),
            ..Default::default()
        },
        (Accepted, WorkInProgress) => ProcurementEffect {
            message: Some(MessageKind::ProcurementWorkInProgress),
            ..Default::default()
        },
        (WorkInProgress, WorkFinished) => ProcurementEffect {
            message: Some(MessageKind::ProcurementWorkFinished),
            ..Default::default()
        },
        (New, Closed)
        | (Open, Closed)
        | (InProgress, Closed)
        | (ProposalSubmitted, Closed)
        | (Accepted, Closed)
        | (Rejected, Closed)
        | (WorkInProgress, Closed) => ProcurementEffect {
            message: Some(MessageKind::ProcurementClosed),
            ..Default::default()
        },
        _ => return None,
    };

    Some(effect)
}

/// Apply a procurement effect's field mutations in place.
pub fn apply_procurement_effect(
    procurement: &mut Procurement,
    to: ProcurementStatus,
    effect: &ProcurementEffect,
    rating: Option<i16>,
    now: DateTime<Utc>,
) {
    procurement.status = to;
    procurement.status_updated_at = now;
    procurement.updated_at = now;

    if effect.resets_proposal {
        procurement.proposal_amount_cents = 0;
        procurement.proposal_currency = DEFAULT_PROPOSAL_CURRENCY.to_string();
        procurement.proposal_file_ref = None;
    }
    if effect.carries_rating {
        if let Some(rating) = rating {
            procurement.rating = Some(rating);
        }
    }
}

/// Work review outcome: `(new status, system message)`.
///
/// Only valid on a `workFinished` procurement; restricted to the
/// recipient's organization. Accepting also stores the supplied rating.
pub fn procurement_review_effect(accept: bool) -> (ProcurementStatus, MessageKind) {
    if accept {
        (ProcurementStatus::Closed, MessageKind::ProcurementClosed)
    } else {
        (
            ProcurementStatus::WorkInProgress,
            MessageKind::ProcurementWorkInProgress,
        )
    }
}

/// Notification kind for any accepted procurement transition.
pub fn procurement_notification() -> NotificationKind {
    NotificationKind::ProcurementStatusChanged
}

/// Statuses proposal submission is allowed from.
pub fn proposal_submittable_from(status: ProcurementStatus) -> bool {
    matches!(
        status,
        ProcurementStatus::Open | ProcurementStatus::InProgress
    )
}
