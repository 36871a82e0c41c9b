//! Deterministic, pure logic for perspective trees.
//!
//! Core modules must be free of I/O side effects. They turn raw model replies
//! into valid trees, move decisions and snapshot patches, and never fail on
//! malformed input.

pub mod extract;
pub mod fallback;
pub mod invariants;
pub mod movement;
pub mod repair;
pub mod snapshot;
pub mod truthy;
pub mod types;
