//! File-based adapter to an out-of-process engine.
//!
//! Protocol, all under `.panel/engine/`:
//! - the engine publishes `snapshot.json`, replacing it atomically;
//! - a start request is `requests/<run_id>.start.json`; the engine adopts
//!   `runId` and reports it in every snapshot of that run;
//! - feedback is `requests/<run_id>.<stage_id>.<n>.feedback.json`.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use panel::core::types::{RunInputs, RunResult, RunStatus};
use panel::io::atomic::write_json_atomic;
use panel::io::engine::{Engine, load_snapshot};
use panel::io::init::PanelPaths;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest<'a> {
    run_id: &'a str,
    inputs: &'a RunInputs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackRequestFile<'a> {
    run_id: &'a str,
    stage_id: &'a str,
    text: &'a str,
}

#[derive(Debug)]
pub struct DirEngine {
    requests_dir: PathBuf,
    snapshot_path: PathBuf,
    poll_interval: Duration,
    current_run: Mutex<Option<String>>,
    feedback_seq: AtomicU64,
}

impl DirEngine {
    pub fn new(paths: &PanelPaths, poll_interval: Duration) -> Self {
        Self {
            requests_dir: paths.requests_dir.clone(),
            snapshot_path: paths.snapshot_path.clone(),
            poll_interval,
            current_run: Mutex::new(None),
            feedback_seq: AtomicU64::new(0),
        }
    }

    fn set_current_run(&self, run_id: Option<String>) {
        if let Ok(mut current) = self.current_run.lock() {
            *current = run_id;
        }
    }

    fn current_run(&self) -> Option<String> {
        self.current_run.lock().ok().and_then(|current| current.clone())
    }

    /// Poll the snapshot until `run_id` reaches a terminal status.
    async fn wait_for_terminal(&self, run_id: &str) -> Result<RunResult> {
        loop {
            tokio::time::sleep(self.poll_interval).await;
            let snapshot = match load_snapshot(&self.snapshot_path) {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => continue,
                Err(err) => {
                    debug!(error = %format!("{err:#}"), "snapshot not readable yet");
                    continue;
                }
            };
            if snapshot.run_id.as_deref() != Some(run_id) || !snapshot.run_status.is_terminal() {
                continue;
            }
            return match (snapshot.run_status, snapshot.run_result) {
                (RunStatus::Errored, _) => bail!("engine reported run {run_id} as ERRORED"),
                (_, Some(result)) => Ok(result),
                (RunStatus::Finished, None) => {
                    bail!("engine finished run {run_id} without a usable runResult")
                }
                (status, None) => Ok(RunResult {
                    status,
                    stats: None,
                    output: String::new(),
                }),
            };
        }
    }
}

impl Engine for DirEngine {
    async fn start(&self, inputs: &RunInputs) -> Result<RunResult> {
        let run_id = new_run_id();
        let path = self.requests_dir.join(format!("{run_id}.start.json"));
        write_json_atomic(
            &path,
            &StartRequest {
                run_id: &run_id,
                inputs,
            },
        )?;
        info!(run_id = %run_id, path = %path.display(), "start request written");
        self.set_current_run(Some(run_id.clone()));

        let result = self.wait_for_terminal(&run_id).await;
        self.set_current_run(None);
        if let Err(err) = &result {
            warn!(run_id = %run_id, error = %format!("{err:#}"), "run did not finish");
        }
        result
    }

    async fn provide_feedback(&self, stage_id: &str, text: &str) -> Result<()> {
        let run_id = match self.current_run() {
            Some(run_id) => run_id,
            // Started elsewhere, or before this process: address the published run.
            None => load_snapshot(&self.snapshot_path)?
                .and_then(|snapshot| snapshot.run_id)
                .ok_or_else(|| anyhow!("no run in progress to receive feedback"))?,
        };
        let n = self.feedback_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self.requests_dir.join(format!(
            "{run_id}.{}.{n}.feedback.json",
            file_safe(stage_id)
        ));
        write_json_atomic(
            &path,
            &FeedbackRequestFile {
                run_id: &run_id,
                stage_id,
                text,
            },
        )?;
        debug!(run_id = %run_id, stage_id = %stage_id, path = %path.display(), "feedback written");
        Ok(())
    }
}

fn new_run_id() -> String {
    format!("req-{}", Utc::now().timestamp_millis())
}

/// Stage ids are engine-defined; keep only filename-safe characters.
fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use panel::io::init::{InitOptions, init_panel};
    use panel::test_support::finished_result;
    use serde_json::Value;

    use super::*;

    fn engine_in(dir: &std::path::Path) -> (PanelPaths, DirEngine) {
        let paths = init_panel(dir, &InitOptions { force: false }).expect("init");
        let engine = DirEngine::new(&paths, Duration::from_millis(5));
        (paths, engine)
    }

    fn pending_start(paths: &PanelPaths) -> Option<Value> {
        let entry = fs::read_dir(&paths.requests_dir)
            .ok()?
            .flatten()
            .find(|entry| entry.file_name().to_string_lossy().ends_with(".start.json"))?;
        serde_json::from_str(&fs::read_to_string(entry.path()).ok()?).ok()
    }

    /// Play the engine: wait for a start request, then publish `status`.
    async fn answer_start(paths: PanelPaths, status: &str, result: Option<RunResult>) {
        let run_result =
            result.map(|result| serde_json::to_value(result).expect("result json"));
        answer_start_raw(paths, status, run_result).await;
    }

    /// Like `answer_start`, with the `runResult` given as raw JSON.
    async fn answer_start_raw(paths: PanelPaths, status: &str, run_result: Option<Value>) {
        let request = loop {
            if let Some(request) = pending_start(&paths) {
                break request;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        let mut snapshot = serde_json::json!({
            "runId": request["runId"],
            "runStatus": status,
        });
        if let Some(run_result) = run_result {
            snapshot["runResult"] = run_result;
        }
        write_json_atomic(&paths.snapshot_path, &snapshot).expect("publish");
    }

    #[tokio::test]
    async fn start_resolves_with_published_result() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (paths, engine) = engine_in(temp.path());
        let inputs = panel::test_support::run_inputs();

        let (result, ()) = tokio::join!(
            engine.start(&inputs),
            answer_start(paths.clone(), "FINISHED", Some(finished_result(3.0, 1, 2, 0.1)))
        );
        let result = result.expect("run result");
        assert_eq!(result.status, RunStatus::Finished);
        assert!(result.stats.is_some());

        let request = pending_start(&paths).expect("request on disk");
        assert_eq!(request["inputs"]["topics"], "Rust, AI Agents");
        assert!(engine.current_run().is_none());
    }

    #[tokio::test]
    async fn errored_run_fails_start() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (paths, engine) = engine_in(temp.path());
        let inputs = panel::test_support::run_inputs();

        let (result, ()) = tokio::join!(
            engine.start(&inputs),
            answer_start(paths, "ERRORED", None)
        );
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("ERRORED"));
    }

    #[tokio::test]
    async fn stopped_run_without_result_is_synthesized() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (paths, engine) = engine_in(temp.path());
        let inputs = panel::test_support::run_inputs();

        let (result, ()) = tokio::join!(
            engine.start(&inputs),
            answer_start(paths, "STOPPED", None)
        );
        let result = result.expect("stopped result");
        assert_eq!(result.status, RunStatus::Stopped);
        assert!(result.stats.is_none());
    }

    #[tokio::test]
    async fn incomplete_stats_still_resolve_start() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (paths, engine) = engine_in(temp.path());
        let inputs = panel::test_support::run_inputs();
        let run_result = serde_json::json!({
            "status": "FINISHED",
            "stats": {
                "duration": 1.0,
                "llmUsage": { "inputTokens": 1, "outputTokens": 2 }
            },
            "output": "# Issue 1\n"
        });

        let (result, ()) = tokio::join!(
            engine.start(&inputs),
            answer_start_raw(paths, "FINISHED", Some(run_result))
        );
        let result = result.expect("run result");
        assert_eq!(result.status, RunStatus::Finished);
        assert!(result.stats.is_none());
        assert_eq!(result.output, "# Issue 1\n");
    }

    #[tokio::test]
    async fn unusable_result_on_finish_fails_start() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (paths, engine) = engine_in(temp.path());
        let inputs = panel::test_support::run_inputs();

        let (result, ()) = tokio::join!(
            engine.start(&inputs),
            answer_start_raw(paths, "FINISHED", Some(Value::from("not a result")))
        );
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("without a usable runResult"));
        assert!(engine.current_run().is_none());
    }

    #[tokio::test]
    async fn feedback_addresses_the_published_run() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (paths, engine) = engine_in(temp.path());
        fs::write(&paths.snapshot_path, r#"{"runId":"req-9","runStatus":"RUNNING"}"#)
            .expect("snapshot");

        engine.provide_feedback("t1", "go on").await.expect("feedback");

        let path = paths.requests_dir.join("req-9.t1.1.feedback.json");
        let body: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("feedback file")).expect("json");
        assert_eq!(body["runId"], "req-9");
        assert_eq!(body["text"], "go on");
    }

    #[tokio::test]
    async fn feedback_requires_a_run() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (_paths, engine) = engine_in(temp.path());
        let err = engine.provide_feedback("t1", "hello").await.unwrap_err();
        assert!(err.to_string().contains("no run in progress"));
    }

    #[tokio::test]
    async fn feedback_files_are_numbered_per_submission() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (paths, engine) = engine_in(temp.path());
        engine.set_current_run(Some("req-1".to_string()));

        engine.provide_feedback("t/1", "first").await.expect("first");
        engine.provide_feedback("t/1", "second").await.expect("second");

        let first = paths.requests_dir.join("req-1.t_1.1.feedback.json");
        let second = paths.requests_dir.join("req-1.t_1.2.feedback.json");
        let body: Value =
            serde_json::from_str(&fs::read_to_string(&first).expect("first file")).expect("json");
        assert_eq!(body["stageId"], "t/1");
        assert_eq!(body["text"], "first");
        assert!(second.exists());
    }
}
