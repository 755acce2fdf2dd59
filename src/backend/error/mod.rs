//! Backend Error Module
//!
//! HTTP projection of the domain errors. Services and stores speak
//! `CoreError`; handlers return `ApiError`, which knows its status code and
//! JSON body shape.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports
//! ├── types.rs      - ApiError and the status-code mapping
//! └── conversion.rs - IntoResponse implementation
//! ```
//!
//! # Status Mapping
//!
//! - `NotFound` → 404
//! - `Forbidden` → 403
//! - `InvalidTransition` → 409 for a disallowed status pair, 400 for a
//!   missing companion field (the reason code rides in the JSON body)
//! - `Constraint` → 400
//! - `Upstream` / `Database` → 500, message redacted
//! - `Unauthorized` → 401

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::{ApiError, ApiResult};
