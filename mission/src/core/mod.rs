//! Deterministic, pure logic shared by the mission core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod anomaly;
pub mod budget;
pub mod catalog;
pub mod geometry;
pub mod invariants;
pub mod plan;
pub mod schedule;
pub mod types;
pub mod vertex;
