//! Route Configuration Module
//!
//! HTTP route assembly for the backend server.
//!
//! - **`router`** - Main router creation: auth layer, tracing, health probe
//! - **`api_routes`** - The `/api` route table (conversations, tickets,
//!   procurements)
//!
//! All `/api` routes require a bearer token; the middleware in
//! `backend::middleware::auth` verifies it and injects the caller as
//! [`AuthUser`](crate::backend::middleware::auth::AuthUser).

/// Main router creation
pub mod router;

/// API endpoint table
pub mod api_routes;

// Re-export commonly used functions
pub use router::create_router;
