//! Backend Module
//!
//! Server-side code for the FixDesk application: an Axum HTTP server over
//! PostgreSQL with push, email and directory integrations.
//!
//! # Architecture
//!
//! The backend is organized into focused submodules:
//!
//! - **`server`** - Server initialization, application state, configuration
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`middleware`** - Bearer-token verification, `AuthUser` extraction
//! - **`auth`** - JWT session tokens
//! - **`chat`** - Conversations, participants, messages, read markers
//! - **`cases`** - Ticket and procurement lifecycles plus the stale sweep
//! - **`membership`** - The conversation visibility/join policy engine
//! - **`directory`** - User and organization lookups
//! - **`notify`** - Notification persistence and push fan-out
//! - **`mail`** - Proposal email delivery
//! - **`uow`** - Transaction wrapper for multi-step writes
//! - **`error`** - HTTP projection of the domain error type
//!
//! # State Management
//!
//! [`AppState`](server::AppState) holds the pool and the domain services;
//! everything in it is cheaply cloneable and shared across handlers.
//!
//! # Error Handling
//!
//! Domain code returns `CoreResult`; handlers convert to
//! [`ApiError`](error::ApiError), which maps each variant to a status code
//! and a small JSON body.

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Request middleware
pub mod middleware;

/// JWT session tokens
pub mod auth;

/// Conversations and messages
pub mod chat;

/// Ticket and procurement lifecycles
pub mod cases;

/// Conversation membership policy
pub mod membership;

/// User and organization directory
pub mod directory;

/// Notification fan-out
pub mod notify;

/// Proposal email delivery
pub mod mail;

/// Unit-of-work transaction wrapper
pub mod uow;

/// Backend error types
pub mod error;

/// Re-export commonly used types
pub use error::{ApiError, ApiResult};
pub use server::{create_app, AppState};
