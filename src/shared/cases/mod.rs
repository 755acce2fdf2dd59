//! Case Module
//!
//! Data structures for the two case types driving the dual-channel
//! conversation model:
//!
//! - `Ticket` - support ticket with priority/due-date handling
//! - `Procurement` - procurement request with a monetary proposal
//!
//! Both share the same shape: a status enum, a creator/recipient/project
//! triple, and exactly one external plus one internal conversation created
//! atomically with the case.

pub mod procurement;
pub mod ticket;

// Re-export all types
pub use procurement::{
    NewProcurementRequest, Procurement, ProcurementStatus, ProcurementStatusRequest,
    SubmitProposalRequest, WorkReviewRequest, DEFAULT_PROPOSAL_CURRENCY,
};
pub use ticket::{
    NewTicketRequest, ResolutionReviewRequest, Ticket, TicketPriority, TicketPriorityRequest,
    TicketStatus, TicketStatusRequest,
};
