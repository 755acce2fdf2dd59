//! Middleware Module
//!
//! HTTP middleware for the backend server.
//!
//! - **`auth`** - Bearer-token verification; inserts [`AuthUser`] into
//!   request extensions for handlers to extract

pub mod auth;

pub use auth::{auth_middleware, AuthUser};
