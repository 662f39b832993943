//! Shared deterministic types for the panel core.
//!
//! These mirror the state object published by the external orchestration
//! engine. Raw worker and stage status codes stay opaque strings here; the
//! classifier is the only place that interprets them.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Metadata key carrying the id of the stage an event refers to.
pub const META_STAGE_ID: &str = "stageId";
/// Metadata key carrying the raw stage status code at event time.
pub const META_STAGE_STATUS: &str = "stageStatus";
/// Metadata key carrying the stage title at event time.
pub const META_STAGE_TITLE: &str = "stageTitle";

/// Overall run status reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    #[default]
    Initial,
    Running,
    Blocked,
    Stopped,
    Errored,
    Finished,
    /// Any status string this panel does not know about.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Terminal statuses end a run; the engine will not advance it further.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Stopped | RunStatus::Errored | RunStatus::Finished)
    }

    pub fn as_code(self) -> &'static str {
        match self {
            RunStatus::Initial => "INITIAL",
            RunStatus::Running => "RUNNING",
            RunStatus::Blocked => "BLOCKED",
            RunStatus::Stopped => "STOPPED",
            RunStatus::Errored => "ERRORED",
            RunStatus::Finished => "FINISHED",
            RunStatus::Unknown => "UNKNOWN",
        }
    }
}

/// A tool a worker may invoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Read-only projection of an engine worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRecord {
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Raw worker status code (e.g. `THINKING`).
    #[serde(default = "initial_code")]
    pub status: String,
}

fn initial_code() -> String {
    "INITIAL".to_string()
}

/// Read-only projection of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub id: String,
    pub title: String,
    /// Raw stage status code (e.g. `DOING`).
    #[serde(default = "todo_code")]
    pub status: String,
    /// Name of the assigned worker, resolved against the snapshot's workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Terminal payload; only meaningful when the stage is `DONE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

fn todo_code() -> String {
    "TODO".to_string()
}

/// Which engine entity produced a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogKind {
    WorkerStatusUpdate,
    StageStatusUpdate,
    RunStatusUpdate,
    #[serde(other)]
    Other,
}

/// One immutable entry of the engine's append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub kind: LogKind,
    pub description: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
}

impl LogEvent {
    /// String metadata field, if present and a string.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.as_ref().is_some_and(|meta| !meta.is_empty())
    }
}

/// Token counts reported for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Cost reported for a run. Pricing is the engine's concern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostDetails {
    pub total_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    #[serde(alias = "duration")]
    pub duration_seconds: f64,
    #[serde(alias = "llmUsageStats")]
    pub llm_usage: LlmUsage,
    pub cost_details: CostDetails,
}

/// Terminal outcome of a run, produced once by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub status: RunStatus,
    /// `None` when absent or not shaped like `RunStats`.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub stats: Option<RunStats>,
    /// Final markdown artifact.
    #[serde(default)]
    pub output: String,
}

/// Inputs for one end-to-end run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunInputs {
    /// Comma-separated newsletter URLs.
    pub newsletters: String,
    /// Comma-separated topics.
    pub topics: String,
    pub user_name: String,
}

/// The engine's published state, as one immutable snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSnapshot {
    pub run_id: Option<String>,
    pub run_status: RunStatus,
    pub workers: Vec<WorkerRecord>,
    pub stages: Vec<StageRecord>,
    /// `None` when absent or unparsable; status and id still parse.
    #[serde(deserialize_with = "lenient")]
    pub run_result: Option<RunResult>,
    pub log: Vec<LogEvent>,
    pub initial_inputs: Option<RunInputs>,
}

impl EngineSnapshot {
    pub fn worker(&self, name: &str) -> Option<&WorkerRecord> {
        self.workers.iter().find(|worker| worker.name == name)
    }
}

/// Deserialize through `Value`; a value of the wrong shape becomes `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}
