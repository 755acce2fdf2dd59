//! Shared Module
//!
//! This module contains the domain types that both the HTTP layer and the
//! storage layer speak: organizations and roles, conversations and messages,
//! cases (tickets and procurements), notifications, and the common error
//! type. All types are designed for serialization and transmission over
//! HTTP as well as persistence through sqlx.

/// Shared error types
pub mod error;

/// Organizations, roles and user profiles
pub mod org;

/// Conversation, participant and message types
pub mod chat;

/// Ticket and procurement case types
pub mod cases;

/// Notification types
pub mod notification;

/// Re-export commonly used types for convenience
pub use error::{CoreError, CoreResult};
pub use org::{OrgKind, Organization, Role, UserProfile};
pub use chat::{Conversation, ConversationKind, Message, MessageKind, Participant};
pub use cases::{Procurement, ProcurementStatus, Ticket, TicketPriority, TicketStatus};
pub use notification::{Notification, NotificationKind};
