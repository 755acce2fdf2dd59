//! Property-based tests over the pure domain logic.

pub mod transitions_proptest;
