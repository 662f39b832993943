//! Test-only fixtures and a scripted engine.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::core::types::{
    CostDetails, EngineSnapshot, LlmUsage, LogEvent, LogKind, META_STAGE_ID, META_STAGE_STATUS,
    META_STAGE_TITLE, RunInputs, RunResult, RunStats, RunStatus, StageRecord, WorkerRecord,
};
use crate::io::engine::Engine;

/// Create a worker with deterministic identity fields.
pub fn worker(name: &str, status: &str) -> WorkerRecord {
    WorkerRecord {
        name: name.to_string(),
        role: format!("{} role", name),
        model: None,
        tools: Vec::new(),
        goal: None,
        background: None,
        status: status.to_string(),
    }
}

/// Create a stage with a deterministic title and no worker.
pub fn stage(id: &str, status: &str) -> StageRecord {
    StageRecord {
        id: id.to_string(),
        title: format!("{} title", id),
        status: status.to_string(),
        worker: None,
        description: None,
        result: None,
    }
}

/// A stage status event carrying the standard metadata keys.
pub fn stage_event(stage_id: &str, status: &str, timestamp: i64) -> LogEvent {
    let mut metadata = BTreeMap::new();
    metadata.insert(META_STAGE_ID.to_string(), Value::from(stage_id));
    metadata.insert(META_STAGE_STATUS.to_string(), Value::from(status));
    metadata.insert(
        META_STAGE_TITLE.to_string(),
        Value::from(format!("{} title", stage_id)),
    );
    LogEvent {
        kind: LogKind::StageStatusUpdate,
        description: format!("stage {} is {}", stage_id, status),
        timestamp,
        metadata: Some(metadata),
    }
}

/// A worker status event without metadata.
pub fn worker_event(status: &str, timestamp: i64) -> LogEvent {
    LogEvent {
        kind: LogKind::WorkerStatusUpdate,
        description: format!("worker is {}", status),
        timestamp,
        metadata: None,
    }
}

pub fn finished_result(
    duration_seconds: f64,
    input_tokens: u64,
    output_tokens: u64,
    total_cost: f64,
) -> RunResult {
    RunResult {
        status: RunStatus::Finished,
        stats: Some(RunStats {
            duration_seconds,
            llm_usage: LlmUsage {
                input_tokens,
                output_tokens,
            },
            cost_details: CostDetails { total_cost },
        }),
        output: "# Newsletter\n".to_string(),
    }
}

pub fn run_inputs() -> RunInputs {
    RunInputs {
        newsletters: "https://example.com/weekly".to_string(),
        topics: "Rust, AI Agents".to_string(),
        user_name: "Dana".to_string(),
    }
}

/// A snapshot with the given status and log and nothing else.
pub fn snapshot(run_status: RunStatus, log: Vec<LogEvent>) -> EngineSnapshot {
    EngineSnapshot {
        run_status,
        log,
        ..EngineSnapshot::default()
    }
}

/// Engine double: records every call and replays queued outcomes.
///
/// `start` pops the next queued result (or fails when the queue is empty).
/// `provide_feedback` succeeds unless a failure was queued.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    starts: Mutex<VecDeque<Result<RunResult, String>>>,
    feedback_failures: Mutex<VecDeque<String>>,
    start_calls: Mutex<Vec<RunInputs>>,
    feedback_calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(results: Vec<Result<RunResult, String>>) -> Self {
        let engine = Self::default();
        engine
            .starts
            .lock()
            .expect("starts lock")
            .extend(results);
        engine
    }

    pub fn fail_next_feedback(&self, message: &str) {
        self.feedback_failures
            .lock()
            .expect("feedback lock")
            .push_back(message.to_string());
    }

    pub fn start_calls(&self) -> Vec<RunInputs> {
        self.start_calls.lock().expect("start calls lock").clone()
    }

    pub fn feedback_calls(&self) -> Vec<(String, String)> {
        self.feedback_calls
            .lock()
            .expect("feedback calls lock")
            .clone()
    }
}

impl Engine for ScriptedEngine {
    async fn start(&self, inputs: &RunInputs) -> Result<RunResult> {
        self.start_calls
            .lock()
            .expect("start calls lock")
            .push(inputs.clone());
        let next = self.starts.lock().expect("starts lock").pop_front();
        match next {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted engine: no queued run result")),
        }
    }

    async fn provide_feedback(&self, stage_id: &str, text: &str) -> Result<()> {
        self.feedback_calls
            .lock()
            .expect("feedback calls lock")
            .push((stage_id.to_string(), text.to_string()));
        let failure = self
            .feedback_failures
            .lock()
            .expect("feedback lock")
            .pop_front();
        match failure {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
}
