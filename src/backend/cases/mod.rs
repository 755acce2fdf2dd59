//! Cases
//!
//! Ticket and procurement lifecycles. The transition tables in
//! [`transitions`] describe every legal status move plus its side
//! effects; the services execute a move inside one unit of work (status
//! update, system message, recipient snapshot) and fan out
//! notifications after commit. [`sweep`] force-closes cases that sat in
//! their review state past the grace period.

pub mod handlers;
pub mod procurements;
pub mod store;
pub mod sweep;
pub mod tickets;
pub mod transitions;

pub use procurements::ProcurementService;
pub use tickets::TicketService;
