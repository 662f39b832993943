//! Control and observability panel for multi-stage curation runs.
//!
//! An external engine runs each stage with an autonomous worker and publishes
//! its state. This crate classifies that state, reduces the event log, gates
//! operator feedback to blocked stages, and aggregates post-run statistics.
//! The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (classification, log reduction,
//!   stats, gating). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (settings, config, archive) and the
//!   [`io::engine::Engine`] boundary. Isolated to enable scripted engines in tests.
//!
//! [`panel`] and [`feedback`] coordinate core logic with I/O; [`view`] builds
//! the projections handed to a rendering layer.

pub mod core;
pub mod exit_codes;
pub mod feedback;
pub mod io;
pub mod logging;
pub mod panel;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod view;
