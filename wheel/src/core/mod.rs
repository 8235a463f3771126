//! Deterministic, pure logic for the sector scheduler and the loop monitor.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures, take wall-clock time as a parameter, and return
//! deterministic outputs suitable for tests.

pub mod invariants;
pub mod metrics;
pub mod outcomes;
pub mod path;
pub mod sectors;
pub mod selector;
pub mod spindle;
pub mod types;
