//! Common test utilities
//!
//! - `database` - the skip-when-unconfigured Postgres fixture
//! - `fixtures` - seeded organizations/users/projects and wired services

pub mod database;
