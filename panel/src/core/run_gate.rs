//! Run-start gating.
//!
//! At most one start request may be outstanding, and none may be issued while
//! the engine reports a running run.

use std::fmt;

use crate::core::types::{RunInputs, RunStatus};

/// Why a start request was refused. No engine call is made in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRejected {
    /// A previous start request has not returned yet.
    InFlight,
    /// The engine reports a run in progress.
    EngineRunning,
    MissingTopics,
    MissingNewsletters,
}

impl fmt::Display for StartRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            StartRejected::InFlight => "a run start is already in flight",
            StartRejected::EngineRunning => "a run is already running",
            StartRejected::MissingTopics => "topics must not be empty",
            StartRejected::MissingNewsletters => "newsletters must not be empty",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for StartRejected {}

/// Tracks whether the control surface accepts a new run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunGate {
    in_flight: bool,
}

impl RunGate {
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Check without changing state. Order: in-flight, engine, inputs.
    pub fn check(&self, run_status: RunStatus, inputs: &RunInputs) -> Result<(), StartRejected> {
        if self.in_flight {
            return Err(StartRejected::InFlight);
        }
        if run_status == RunStatus::Running {
            return Err(StartRejected::EngineRunning);
        }
        if inputs.topics.trim().is_empty() {
            return Err(StartRejected::MissingTopics);
        }
        if inputs.newsletters.trim().is_empty() {
            return Err(StartRejected::MissingNewsletters);
        }
        Ok(())
    }

    /// Close the gate for a new start request.
    pub fn try_begin(
        &mut self,
        run_status: RunStatus,
        inputs: &RunInputs,
    ) -> Result<(), StartRejected> {
        self.check(run_status, inputs)?;
        self.in_flight = true;
        Ok(())
    }

    /// Reopen after the start request returned, successfully or not.
    pub fn release(&mut self) {
        self.in_flight = false;
    }
}

/// Fill a blank user name with `fallback`.
pub fn normalize_inputs(mut inputs: RunInputs, fallback: &str) -> RunInputs {
    if inputs.user_name.trim().is_empty() {
        inputs.user_name = fallback.to_string();
    }
    inputs
}
