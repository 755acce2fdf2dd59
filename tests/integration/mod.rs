//! End-to-end tests over a real PostgreSQL database.

pub mod conversations_test;
pub mod procurements_test;
pub mod sweep_test;
pub mod tickets_test;
