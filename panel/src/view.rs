//! Read-only projections handed to the rendering layer.

use chrono::{Local, TimeZone};
use serde::Serialize;
use serde_json::Value;

use crate::core::alerts::OperatorError;
use crate::core::classifier::{
    Badge, ColorBand, Domain, StageStatus, classify, classify_stage, humanize_code,
    worker_indicator, worker_is_active,
};
use crate::core::log_reducer::LogSummary;
use crate::core::stats::DisplayStats;
use crate::core::types::{
    EngineSnapshot, LogEvent, RunInputs, RunStatus, StageRecord, WorkerRecord,
};
use crate::io::settings::Credentials;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    pub run_status: RunStatus,
    pub workers: Vec<WorkerView>,
    pub stages: Vec<StageView>,
    /// The log panel is only shown while a run is in progress.
    pub log_visible: bool,
    pub latest_event: Option<LogView>,
    pub is_blocked: bool,
    pub blocked_stage_id: Option<String>,
    pub feedback_draft: String,
    pub feedback_enabled: bool,
    pub start_enabled: bool,
    pub default_inputs: RunInputs,
    pub stats: Option<StatsView>,
    pub output: Option<String>,
    pub errors: Vec<OperatorError>,
    pub credentials: CredentialStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerView {
    pub name: String,
    pub role: String,
    pub model: Option<String>,
    pub tools: Vec<String>,
    pub status: String,
    pub status_text: String,
    pub badge: Badge,
    pub is_active: bool,
    pub indicator: ColorBand,
}

impl From<&WorkerRecord> for WorkerView {
    fn from(worker: &WorkerRecord) -> Self {
        WorkerView {
            name: worker.name.clone(),
            role: worker.role.clone(),
            model: worker.model.clone(),
            tools: worker.tools.iter().map(|tool| tool.name.clone()).collect(),
            status: worker.status.clone(),
            status_text: humanize_code(&worker.status),
            badge: classify(&worker.status, Domain::Worker),
            is_active: worker_is_active(&worker.status),
            indicator: worker_indicator(&worker.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub badge: Badge,
    pub highlight: Option<ColorBand>,
    pub worker: Option<String>,
    pub worker_badge: Option<Badge>,
    /// Present only once the stage is done.
    pub result: Option<String>,
}

impl StageView {
    fn project(stage: &StageRecord, snapshot: &EngineSnapshot) -> Self {
        let worker_badge = stage.worker.as_deref().map(|name| {
            let code = snapshot.worker(name).map_or("IDLE", |worker| worker.status.as_str());
            classify(code, Domain::Worker)
        });
        let result = if StageStatus::from_code(&stage.status) == Some(StageStatus::Done) {
            stage.result.as_ref().map(result_text)
        } else {
            None
        };
        StageView {
            id: stage.id.clone(),
            title: stage.title.clone(),
            description: stage.description.clone(),
            status: stage.status.clone(),
            badge: classify(&stage.status, Domain::Stage),
            highlight: classify_stage(&stage.status).highlight(),
            worker: stage.worker.clone(),
            worker_badge,
            result,
        }
    }
}

/// Strings verbatim, anything else pretty-printed.
fn result_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogView {
    pub description: String,
    pub timestamp: i64,
    pub time: String,
    pub has_metadata: bool,
    pub metadata: Option<String>,
}

impl From<&LogEvent> for LogView {
    fn from(event: &LogEvent) -> Self {
        let metadata = event
            .metadata
            .as_ref()
            .filter(|_| event.has_metadata())
            .and_then(|meta| serde_json::to_string_pretty(meta).ok());
        LogView {
            description: event.description.clone(),
            timestamp: event.timestamp,
            time: format_event_time(event.timestamp),
            has_metadata: event.has_metadata(),
            metadata,
        }
    }
}

/// Local wall-clock time (`HH:MM:SS`) for an epoch-millisecond timestamp.
pub fn format_event_time(timestamp_ms: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    #[serde(flatten)]
    pub raw: DisplayStats,
    pub duration_label: String,
    pub tokens_label: String,
    pub cost_label: String,
}

impl From<&DisplayStats> for StatsView {
    fn from(stats: &DisplayStats) -> Self {
        StatsView {
            raw: *stats,
            duration_label: stats.duration_label(),
            tokens_label: stats.tokens_label(),
            cost_label: stats.cost_label(),
        }
    }
}

/// Whether each key is set. Secrets never leave the settings endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    pub llm_key_set: bool,
    pub crawler_key_set: bool,
}

impl From<&Credentials> for CredentialStatus {
    fn from(credentials: &Credentials) -> Self {
        CredentialStatus {
            llm_key_set: !credentials.llm_key.is_empty(),
            crawler_key_set: !credentials.crawler_key.is_empty(),
        }
    }
}

/// Everything `PanelView` needs beyond the snapshot.
pub struct ViewInputs<'a> {
    pub snapshot: &'a EngineSnapshot,
    pub summary: LogSummary<'a>,
    pub feedback_draft: &'a str,
    pub feedback_enabled: bool,
    pub start_enabled: bool,
    pub default_inputs: RunInputs,
    pub stats: Option<&'a DisplayStats>,
    pub output: Option<&'a str>,
    pub errors: Vec<OperatorError>,
    pub credentials: &'a Credentials,
}

impl PanelView {
    pub fn build(inputs: ViewInputs<'_>) -> Self {
        let snapshot = inputs.snapshot;
        PanelView {
            run_status: snapshot.run_status,
            workers: snapshot.workers.iter().map(WorkerView::from).collect(),
            stages: snapshot
                .stages
                .iter()
                .map(|stage| StageView::project(stage, snapshot))
                .collect(),
            log_visible: snapshot.run_status == RunStatus::Running && !snapshot.log.is_empty(),
            latest_event: inputs.summary.latest.map(LogView::from),
            is_blocked: inputs.summary.is_blocked,
            blocked_stage_id: inputs.summary.blocked_stage_id.map(str::to_string),
            feedback_draft: inputs.feedback_draft.to_string(),
            feedback_enabled: inputs.feedback_enabled,
            start_enabled: inputs.start_enabled,
            default_inputs: inputs.default_inputs,
            stats: inputs.stats.map(StatsView::from),
            output: inputs.output.map(str::to_string),
            errors: inputs.errors,
            credentials: CredentialStatus::from(inputs.credentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::IconClass;
    use crate::test_support::{stage, stage_event, worker};

    #[test]
    fn stage_result_only_shown_when_done() {
        let mut snapshot = EngineSnapshot::default();
        let mut doing = stage("t1", "DOING");
        doing.result = Some(Value::from("partial"));
        let mut done = stage("t2", "DONE");
        done.result = Some(serde_json::json!({ "items": 3 }));
        snapshot.stages = vec![doing, done];

        let views: Vec<StageView> = snapshot
            .stages
            .iter()
            .map(|stage| StageView::project(stage, &snapshot))
            .collect();
        assert_eq!(views[0].result, None);
        assert_eq!(views[1].result.as_deref(), Some("{\n  \"items\": 3\n}"));
        assert_eq!(views[0].highlight, Some(ColorBand::Blue));
        assert_eq!(views[1].highlight, None);
    }

    #[test]
    fn stage_worker_badge_follows_worker_status() {
        let mut snapshot = EngineSnapshot::default();
        snapshot.workers = vec![worker("Alex", "USING_TOOL")];
        let mut assigned = stage("t1", "DOING");
        assigned.worker = Some("Alex".to_string());
        let mut orphan = stage("t2", "TODO");
        orphan.worker = Some("Nobody".to_string());

        let assigned_view = StageView::project(&assigned, &snapshot);
        let orphan_view = StageView::project(&orphan, &snapshot);
        assert_eq!(assigned_view.worker_badge.map(|b| b.icon), Some(IconClass::Wrench));
        assert_eq!(orphan_view.worker_badge.map(|b| b.label), Some("Idle"));
        assert_eq!(StageView::project(&stage("t3", "TODO"), &snapshot).worker_badge, None);
    }

    #[test]
    fn worker_view_humanizes_status() {
        let view = WorkerView::from(&worker("Sam", "MAX_ITERATIONS_ERROR"));
        assert_eq!(view.status_text, "Max Iterations Error");
        assert_eq!(view.badge.label, "Error");
        assert_eq!(view.indicator, ColorBand::Red);
    }

    #[test]
    fn log_view_pretty_prints_metadata() {
        let view = LogView::from(&stage_event("t1", "BLOCKED", 1_700_000_000_000));
        assert!(view.has_metadata);
        let metadata = view.metadata.expect("metadata");
        assert!(metadata.contains("\"stageStatus\": \"BLOCKED\""));
        assert_eq!(view.time.len(), 8);
        assert_eq!(view.time.matches(':').count(), 2);
    }

    #[test]
    fn credential_status_hides_values() {
        let status = CredentialStatus::from(&Credentials {
            llm_key: "sk-secret".to_string(),
            crawler_key: String::new(),
        });
        assert!(status.llm_key_set);
        assert!(!status.crawler_key_set);
        let json = serde_json::to_string(&status).expect("json");
        assert!(!json.contains("sk-secret"));
    }
}
