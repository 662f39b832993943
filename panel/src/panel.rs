//! Panel state: observes engine snapshots and mediates operator actions.
//!
//! The panel is a read-only consumer of engine state. It never mutates a
//! snapshot; it only replaces it when the engine publishes a new one. Engine
//! calls are split into a synchronous begin step, the awaited call, and a
//! synchronous settle step, so callers can release any lock around the panel
//! while the engine works.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::core::alerts::{ErrorChannel, ErrorSource, OperatorError};
use crate::core::feedback::{FeedbackRequest, FeedbackSkip};
use crate::core::log_reducer::{LogSummary, reduce};
use crate::core::run_gate::{RunGate, StartRejected, normalize_inputs};
use crate::core::stats::{DisplayStats, aggregate};
use crate::core::types::{EngineSnapshot, RunInputs, RunResult, RunStatus};
use crate::feedback::{FeedbackGate, FeedbackOutcome, deliver};
use crate::io::config::{PanelConfig, load_config};
use crate::io::engine::Engine;
use crate::io::init::PanelPaths;
use crate::io::run_archive::write_run_archive;
use crate::io::settings::{Credentials, CredentialsPatch, SettingsStore};
use crate::view::{PanelView, ViewInputs};

/// Proof that a start request passed the gate; consumed by `finish_run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTicket {
    /// Panel-side identifier; names the archive directory.
    pub run_id: String,
    /// Inputs as they will be sent to the engine.
    pub inputs: RunInputs,
}

#[derive(Debug)]
pub struct Panel {
    paths: PanelPaths,
    config: PanelConfig,
    settings: SettingsStore,
    snapshot: EngineSnapshot,
    gate: RunGate,
    feedback: FeedbackGate,
    stats: Option<DisplayStats>,
    output: Option<String>,
    errors: ErrorChannel,
}

impl Panel {
    /// Build a panel for `paths`. Credentials are read once, here.
    pub fn new(paths: PanelPaths, config: PanelConfig) -> Self {
        let settings = SettingsStore::open(&paths.settings_path);
        let errors = ErrorChannel::new(config.error_history_limit);
        Self {
            paths,
            config,
            settings,
            snapshot: EngineSnapshot::default(),
            gate: RunGate::default(),
            feedback: FeedbackGate::default(),
            stats: None,
            output: None,
            errors,
        }
    }

    /// Load config from the project and build a panel.
    pub fn open(root: &Path) -> Result<Self> {
        let paths = PanelPaths::new(root);
        let config = load_config(&paths.config_path)?;
        Ok(Self::new(paths, config))
    }

    pub fn paths(&self) -> &PanelPaths {
        &self.paths
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Change notification: replace the held snapshot with the engine's latest.
    pub fn observe(&mut self, snapshot: EngineSnapshot) {
        debug!(
            run_id = ?snapshot.run_id,
            run_status = snapshot.run_status.as_code(),
            events = snapshot.log.len(),
            "snapshot observed"
        );
        self.snapshot = snapshot;
    }

    pub fn snapshot(&self) -> &EngineSnapshot {
        &self.snapshot
    }

    pub fn log_summary(&self) -> LogSummary<'_> {
        reduce(&self.snapshot.log)
    }

    pub fn display_stats(&self) -> Option<&DisplayStats> {
        self.stats.as_ref()
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    pub fn credentials(&self) -> &Credentials {
        self.settings.current()
    }

    pub fn feedback_draft(&self) -> &str {
        self.feedback.draft()
    }

    /// Whether the control surface should accept a new run right now.
    pub fn start_enabled(&self) -> bool {
        !self.gate.in_flight() && self.snapshot.run_status != RunStatus::Running
    }

    /// Inputs to prefill the run form with.
    pub fn default_inputs(&self) -> RunInputs {
        self.snapshot
            .initial_inputs
            .clone()
            .unwrap_or_else(|| RunInputs::from(&self.config.defaults))
    }

    /// Pass the gate and clear the previous run's stats.
    pub fn begin_run(&mut self, inputs: RunInputs) -> Result<RunTicket, StartRejected> {
        let inputs = normalize_inputs(inputs, &self.config.fallback_user_name);
        if let Err(rejected) = self.gate.try_begin(self.snapshot.run_status, &inputs) {
            info!(reason = %rejected, "run start rejected");
            return Err(rejected);
        }
        self.stats = None;
        self.output = None;
        let run_id = format!("run-{}", Utc::now().timestamp_millis());
        info!(run_id = %run_id, topics = %inputs.topics, "run start requested");
        Ok(RunTicket { run_id, inputs })
    }

    /// Apply the engine's answer to a start request and reopen the gate.
    pub fn finish_run(
        &mut self,
        ticket: RunTicket,
        outcome: Result<RunResult>,
    ) -> Option<&DisplayStats> {
        self.gate.release();
        match outcome {
            Ok(result) => {
                self.stats = aggregate(&result);
                info!(
                    run_id = %ticket.run_id,
                    status = result.status.as_code(),
                    has_stats = self.stats.is_some(),
                    "run finished"
                );
                if result.status == RunStatus::Finished {
                    self.archive(&ticket.run_id, &result);
                }
                if !result.output.is_empty() {
                    self.output = Some(result.output);
                }
            }
            Err(err) => {
                self.stats = None;
                let message = format!("{err:#}");
                error!(run_id = %ticket.run_id, error = %message, "run start failed");
                self.report(ErrorSource::RunStart, message);
            }
        }
        self.stats.as_ref()
    }

    /// Gate, call the engine, and settle. Rejections never reach the engine.
    pub async fn start_run<E: Engine>(
        &mut self,
        engine: &E,
        inputs: RunInputs,
    ) -> Result<Option<DisplayStats>, StartRejected> {
        let ticket = self.begin_run(inputs)?;
        let outcome = engine.start(&ticket.inputs).await;
        Ok(self.finish_run(ticket, outcome).copied())
    }

    pub fn set_feedback_draft(&mut self, text: impl Into<String>) {
        self.feedback.set_draft(text);
    }

    pub fn feedback_enabled(&self) -> bool {
        self.feedback.can_submit(self.log_summary().blocked_stage_id)
    }

    /// Capture the stage id blocked right now together with the draft.
    pub fn capture_feedback(&self) -> Result<FeedbackRequest, FeedbackSkip> {
        self.feedback.capture(self.log_summary().blocked_stage_id)
    }

    /// Apply a delivery outcome: clear the draft or report the failure.
    pub fn settle_feedback(&mut self, request: &FeedbackRequest, outcome: &FeedbackOutcome) {
        self.feedback.settle(request, outcome);
        if let FeedbackOutcome::Failed { stage_id, message } = outcome {
            self.report(
                ErrorSource::Feedback,
                format!("feedback for stage {stage_id} failed: {message}"),
            );
        }
    }

    /// Submit the current draft to the currently blocked stage.
    pub async fn submit_feedback<E: Engine>(&mut self, engine: &E) -> FeedbackOutcome {
        let request = match self.capture_feedback() {
            Ok(request) => request,
            Err(skip) => {
                debug!(reason = %skip, "feedback skipped");
                return FeedbackOutcome::skipped(skip);
            }
        };
        let outcome = deliver(engine, &request).await;
        self.settle_feedback(&request, &outcome);
        outcome
    }

    /// Merge a partial credential update and persist it.
    pub fn update_credentials(&mut self, patch: CredentialsPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let result = self.settings.update(patch);
        if let Err(err) = &result {
            let message = format!("{err:#}");
            warn!(error = %message, "credentials not persisted");
            self.report(ErrorSource::Settings, message);
        }
        result
    }

    pub fn view(&self) -> PanelView {
        PanelView::build(ViewInputs {
            snapshot: &self.snapshot,
            summary: self.log_summary(),
            feedback_draft: self.feedback.draft(),
            feedback_enabled: self.feedback_enabled(),
            start_enabled: self.start_enabled(),
            default_inputs: self.default_inputs(),
            stats: self.stats.as_ref(),
            output: self.output.as_deref(),
            errors: self.errors.entries().cloned().collect(),
            credentials: self.settings.current(),
        })
    }

    fn archive(&mut self, run_id: &str, result: &RunResult) {
        match write_run_archive(
            &self.paths.runs_dir,
            run_id,
            &result.output,
            self.stats.as_ref(),
        ) {
            Ok(paths) => debug!(dir = %paths.dir.display(), "run archived"),
            Err(err) => {
                let message = format!("{err:#}");
                warn!(run_id = %run_id, error = %message, "run archive failed");
                self.report(ErrorSource::Archive, message);
            }
        }
    }

    fn report(&mut self, source: ErrorSource, message: String) {
        self.errors.push(OperatorError {
            source,
            message,
            at_ms: Utc::now().timestamp_millis(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedEngine, finished_result, run_inputs, snapshot, stage_event};

    fn panel_in(dir: &Path) -> Panel {
        Panel::new(PanelPaths::new(dir), PanelConfig::default())
    }

    #[test]
    fn begin_run_clears_previous_stats() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut panel = panel_in(temp.path());
        let ticket = panel.begin_run(run_inputs()).expect("begin");
        panel.finish_run(ticket, Ok(finished_result(1.0, 2, 3, 0.5)));
        assert!(panel.display_stats().is_some());

        panel.begin_run(run_inputs()).expect("begin again");
        assert!(panel.display_stats().is_none());
        assert!(panel.output().is_none());
        assert!(!panel.start_enabled());
    }

    #[test]
    fn engine_running_disables_start() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut panel = panel_in(temp.path());
        panel.observe(snapshot(RunStatus::Running, Vec::new()));
        assert!(!panel.start_enabled());
        assert_eq!(
            panel.begin_run(run_inputs()),
            Err(StartRejected::EngineRunning)
        );
    }

    #[test]
    fn stopped_result_leaves_stats_cleared() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut panel = panel_in(temp.path());
        let ticket = panel.begin_run(run_inputs()).expect("begin");
        let mut result = finished_result(1.0, 1, 1, 0.1);
        result.status = RunStatus::Stopped;
        assert!(panel.finish_run(ticket.clone(), Ok(result)).is_none());
        assert!(!panel.paths().run_dir(&ticket.run_id).exists());
        assert!(panel.start_enabled());
    }

    #[test]
    fn blank_user_name_is_replaced_in_ticket() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut panel = panel_in(temp.path());
        let mut inputs = run_inputs();
        inputs.user_name.clear();
        let ticket = panel.begin_run(inputs).expect("begin");
        assert_eq!(ticket.inputs.user_name, "Guest");
    }

    #[tokio::test]
    async fn feedback_uses_stage_captured_at_submission() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut panel = panel_in(temp.path());
        let engine = ScriptedEngine::new();
        panel.observe(snapshot(
            RunStatus::Running,
            vec![stage_event("t1", "BLOCKED", 1)],
        ));
        panel.set_feedback_draft("look at the archive page");
        let request = panel.capture_feedback().expect("capture");

        // t2 becomes blocked while the request is in flight.
        panel.observe(snapshot(
            RunStatus::Running,
            vec![stage_event("t1", "BLOCKED", 1), stage_event("t2", "BLOCKED", 2)],
        ));
        let outcome = deliver(&engine, &request).await;
        panel.settle_feedback(&request, &outcome);

        assert_eq!(
            engine.feedback_calls(),
            vec![("t1".to_string(), "look at the archive page".to_string())]
        );
        assert_eq!(panel.feedback_draft(), "");
    }

    #[tokio::test]
    async fn failed_feedback_is_reported_and_retained() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut panel = panel_in(temp.path());
        let engine = ScriptedEngine::new();
        engine.fail_next_feedback("engine rejected feedback");
        panel.observe(snapshot(
            RunStatus::Running,
            vec![stage_event("t1", "BLOCKED", 1)],
        ));
        panel.set_feedback_draft("retry with page 2");

        let outcome = panel.submit_feedback(&engine).await;
        assert!(matches!(outcome, FeedbackOutcome::Failed { .. }));
        assert_eq!(panel.feedback_draft(), "retry with page 2");
        let latest = panel.errors().latest().expect("error reported");
        assert_eq!(latest.source, ErrorSource::Feedback);
        assert!(latest.message.contains("engine rejected feedback"));
    }

    #[tokio::test]
    async fn feedback_without_block_is_skipped() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut panel = panel_in(temp.path());
        let engine = ScriptedEngine::new();
        panel.observe(snapshot(
            RunStatus::Running,
            vec![stage_event("t1", "DOING", 1)],
        ));
        panel.set_feedback_draft("anything");
        assert!(!panel.feedback_enabled());
        let outcome = panel.submit_feedback(&engine).await;
        assert!(matches!(outcome, FeedbackOutcome::Skipped { .. }));
        assert!(engine.feedback_calls().is_empty());
        assert!(panel.errors().is_empty());
    }

    #[test]
    fn empty_credential_patch_is_not_written() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut panel = panel_in(temp.path());
        panel
            .update_credentials(CredentialsPatch::default())
            .expect("noop");
        assert!(!panel.paths().settings_path.exists());
    }
}
