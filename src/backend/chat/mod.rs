//! Chat Backend Module
//!
//! Conversations, participants and the append-only message timeline.
//!
//! - **`store`** - row-level SQL for conversations, participants, messages
//!   and read markers
//! - **`service`** - membership-aware operations (post, page, mark read,
//!   add/remove participants) built on the store
//! - **`handlers`** - Axum endpoints over the service
//!
//! Case-bound conversations (external/internal) are created by the case
//! services; this module creates only the ad-hoc kinds.

pub mod handlers;
pub mod service;
pub mod store;

pub use service::ChatService;
