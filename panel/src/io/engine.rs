//! Boundary to the external orchestration engine.
//!
//! The [`Engine`] trait decouples the panel from the engine that actually runs
//! the pipeline. Tests use a scripted engine that records calls and replays
//! queued outcomes.

use std::fs;
use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::{EngineSnapshot, RunInputs, RunResult};

/// Operations the panel forwards to the engine.
pub trait Engine {
    /// Start a run and resolve once it reaches a terminal state.
    fn start(&self, inputs: &RunInputs) -> impl Future<Output = Result<RunResult>> + Send;

    /// Deliver operator feedback to one blocked stage.
    fn provide_feedback(
        &self,
        stage_id: &str,
        text: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Read a published snapshot. `Ok(None)` when the engine has not published yet.
pub fn load_snapshot(path: &Path) -> Result<Option<EngineSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read snapshot {}", path.display()))?;
    let snapshot: EngineSnapshot = serde_json::from_str(&contents)
        .with_context(|| format!("parse snapshot {}", path.display()))?;
    debug!(
        path = %path.display(),
        run_id = ?snapshot.run_id,
        events = snapshot.log.len(),
        "snapshot loaded"
    );
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RunStatus;

    #[test]
    fn missing_snapshot_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(
            load_snapshot(&temp.path().join("snapshot.json"))
                .expect("load")
                .is_none()
        );
    }

    #[test]
    fn snapshot_is_parsed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("snapshot.json");
        fs::write(&path, r#"{"runId":"r1","runStatus":"RUNNING"}"#).expect("write");
        let snapshot = load_snapshot(&path).expect("load").expect("some");
        assert_eq!(snapshot.run_id.as_deref(), Some("r1"));
        assert_eq!(snapshot.run_status, RunStatus::Running);
    }

    #[test]
    fn garbage_snapshot_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("snapshot.json");
        fs::write(&path, "[").expect("write");
        let err = load_snapshot(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parse snapshot"));
    }
}
