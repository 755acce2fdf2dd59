//! Property-based tests for the case transition tables.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use fixdesk::backend::cases::transitions::{
    apply_procurement_effect, apply_ticket_effect, procurement_transition, ticket_transition,
};
use fixdesk::shared::cases::{
    Procurement, ProcurementStatus, Ticket, TicketPriority, TicketStatus,
    DEFAULT_PROPOSAL_CURRENCY,
};

fn ticket(status: TicketStatus, due_date: Option<DateTime<Utc>>) -> Ticket {
    let now = Utc::now();
    Ticket {
        id: Uuid::new_v4(),
        project_id: Uuid::new_v4(),
        created_by: Uuid::new_v4(),
        recipient_id: Uuid::new_v4(),
        external_conversation_id: Uuid::new_v4(),
        internal_conversation_id: Uuid::new_v4(),
        status,
        status_updated_at: now,
        title: "prop ticket".to_string(),
        description: String::new(),
        priority: TicketPriority::Normal,
        due_date,
        opened_at: None,
        on_hold_at: None,
        rating: None,
        created_at: now,
        updated_at: now,
    }
}

fn procurement(amount_cents: i64, currency: String) -> Procurement {
    let now = Utc::now();
    Procurement {
        id: Uuid::new_v4(),
        project_id: Uuid::new_v4(),
        created_by: Uuid::new_v4(),
        recipient_id: Uuid::new_v4(),
        external_conversation_id: Uuid::new_v4(),
        internal_conversation_id: Uuid::new_v4(),
        status: ProcurementStatus::ProposalSubmitted,
        status_updated_at: now,
        title: "prop procurement".to_string(),
        description: String::new(),
        due_date: None,
        rating: None,
        proposal_amount_cents: amount_cents,
        proposal_currency: currency,
        proposal_file_ref: Some("blob:prop".to_string()),
        created_at: now,
        updated_at: now,
    }
}

fn any_ticket_status() -> impl Strategy<Value = TicketStatus> {
    prop::sample::select(TicketStatus::all().to_vec())
}

fn any_procurement_status() -> impl Strategy<Value = ProcurementStatus> {
    prop::sample::select(ProcurementStatus::all().to_vec())
}

proptest! {
    #[test]
    fn test_requesting_current_ticket_status_is_rejected(status in any_ticket_status()) {
        prop_assert!(ticket_transition(status, status).is_none());
    }

    #[test]
    fn test_requesting_current_procurement_status_is_rejected(
        status in any_procurement_status(),
    ) {
        prop_assert!(procurement_transition(status, status).is_none());
    }

    #[test]
    fn test_closed_ticket_is_terminal(to in any_ticket_status()) {
        prop_assert!(ticket_transition(TicketStatus::Closed, to).is_none());
    }

    #[test]
    fn test_closed_procurement_is_terminal(to in any_procurement_status()) {
        prop_assert!(procurement_transition(ProcurementStatus::Closed, to).is_none());
    }

    #[test]
    fn test_hold_preserves_remaining_time_to_due(
        due_minutes in 1i64..100_000,
        hold_minutes in 0i64..50_000,
    ) {
        let start = Utc::now();
        let due = start + Duration::minutes(due_minutes);
        let mut t = ticket(TicketStatus::Open, Some(due));

        let hold = ticket_transition(TicketStatus::Open, TicketStatus::OnHold).unwrap();
        apply_ticket_effect(&mut t, TicketStatus::OnHold, &hold, start);

        let reopen_at = start + Duration::minutes(hold_minutes);
        let reopen = ticket_transition(TicketStatus::OnHold, TicketStatus::Open).unwrap();
        apply_ticket_effect(&mut t, TicketStatus::Open, &reopen, reopen_at);

        // However long the hold lasted, the remaining time-to-due on reopen
        // equals what it was when the hold began.
        prop_assert_eq!(t.due_date.unwrap() - reopen_at, due - start);
        prop_assert_eq!(t.on_hold_at, None);
    }

    #[test]
    fn test_proposal_cancel_always_clears_the_proposal(
        amount_cents in 1i64..10_000_000,
        currency in "[A-Z]{3}",
    ) {
        let mut p = procurement(amount_cents, currency);
        let effect = procurement_transition(
            ProcurementStatus::ProposalSubmitted,
            ProcurementStatus::Open,
        )
        .unwrap();
        apply_procurement_effect(&mut p, ProcurementStatus::Open, &effect, None, Utc::now());

        prop_assert_eq!(p.proposal_amount_cents, 0);
        prop_assert_eq!(p.proposal_currency.as_str(), DEFAULT_PROPOSAL_CURRENCY);
        prop_assert_eq!(p.proposal_file_ref, None);
    }
}
