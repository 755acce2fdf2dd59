//! Authentication Module
//!
//! JWT session tokens. Issuance lives in the external identity service;
//! this backend only verifies the bearer token on each request (in
//! `backend::middleware::auth`) and derives the caller from its `sub`
//! claim. `create_token` exists for the integration tests, which mint
//! their own tokens.
//!
//! # Security
//!
//! - Tokens are HS256-signed with the shared `JWT_SECRET`
//! - Expired or malformed tokens return 401 (no information leakage)

/// JWT token verification and (test-facing) generation
pub mod sessions;

// Re-export commonly used functions
pub use sessions::{create_token, verify_token, Claims};
