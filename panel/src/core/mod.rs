//! Deterministic, pure logic shared by the panel.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! snapshots of engine state and return deterministic outputs suitable for tests.

pub mod alerts;
pub mod classifier;
pub mod feedback;
pub mod log_reducer;
pub mod run_gate;
pub mod stats;
pub mod types;
