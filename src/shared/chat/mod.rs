//! Chat Module
//!
//! Data structures for the conversation store:
//!
//! - `Conversation` - a message thread with a fixed kind
//! - `Participant` - a user's (soft-removable) membership in a thread
//! - `Message` - user text or one of the system event kinds
//!
//! # Usage
//!
//! ```rust
//! use fixdesk::shared::chat::{Conversation, ConversationKind, Message, MessageKind};
//! ```

pub mod conversation;
pub mod message;

// Re-export all types
pub use conversation::{
    AddParticipantRequest, Conversation, ConversationKind, NewConversationRequest, Participant,
    ParticipantRole, UnreadCount,
};
pub use message::{
    ListMessagesQuery, MarkReadRequest, Message, MessageKind, MessagePage, NewMessageRequest,
};
