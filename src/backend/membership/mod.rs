//! Membership & visibility engine
//!
//! Who may read, join, post in, or be added to each conversation. The rules
//! live in one pure policy table (`policy`); the service layer (`service`)
//! resolves the inputs via the directory and applies outcomes to the store.

pub mod policy;
mod service;

pub use policy::{CaseStanding, Decision, DenyReason};
pub use service::{CaseParties, MembershipEngine};
