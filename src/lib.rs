// Increase recursion limit for deeply nested async state machines
#![recursion_limit = "256"]

//! FixDesk - Main Library
//!
//! FixDesk is a multi-tenant facilities-management backend. Client and
//! provider organizations work cases together: repair tickets and
//! procurement orders, each born with a pair of conversations (an external
//! one both sides see and an internal one only the provider sees).
//!
//! # Overview
//!
//! The library provides:
//! - Conversations with append-only message timelines and per-participant
//!   read markers
//! - A policy table deciding who may see and join which conversation, with
//!   silent escalation of provider staff into the internal room
//! - Table-driven ticket and procurement lifecycles whose transitions post
//!   system messages and fan out notifications
//! - A sweeper that force-closes cases left in review past the grace period
//!
//! # Module Structure
//!
//! - **`shared`** - Types both the HTTP layer and storage speak
//!   - Organizations, roles and user profiles
//!   - Conversations, participants, messages
//!   - Tickets, procurements, notifications
//!   - The common error type
//!
//! - **`backend`** - Server-side code
//!   - Axum HTTP server, routes and middleware
//!   - Domain services over sqlx/PostgreSQL stores
//!   - Push, email and directory integrations
//!
//! # Usage
//!
//! ```rust,no_run
//! use fixdesk::backend::server::init::create_app;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_app().await?;
//! // Use app with axum::serve
//! # Ok(())
//! # }
//! ```

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
pub mod backend;
