//! Feedback gate: forwards operator input to the engine for one blocked stage.
//!
//! The stage id is captured when the operator submits, never recomputed after.
//! A newer log event may point at a different stage by the time the engine
//! call runs; the captured id still wins.

use serde::Serialize;
use tracing::{info, warn};

use crate::core::feedback::{FeedbackRequest, FeedbackSkip};
use crate::io::engine::Engine;

/// Result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// Preconditions failed; the engine was not called.
    Skipped { reason: String },
    Delivered { stage_id: String },
    /// The engine call failed; the draft is kept for resubmission.
    Failed { stage_id: String, message: String },
}

impl FeedbackOutcome {
    pub fn skipped(skip: FeedbackSkip) -> Self {
        FeedbackOutcome::Skipped {
            reason: skip.to_string(),
        }
    }
}

/// Forward an already captured request.
pub async fn deliver<E: Engine>(engine: &E, request: &FeedbackRequest) -> FeedbackOutcome {
    match engine
        .provide_feedback(&request.stage_id, &request.text)
        .await
    {
        Ok(()) => {
            info!(stage_id = %request.stage_id, "feedback delivered");
            FeedbackOutcome::Delivered {
                stage_id: request.stage_id.clone(),
            }
        }
        Err(err) => {
            warn!(
                stage_id = %request.stage_id,
                error = %format!("{err:#}"),
                "feedback delivery failed"
            );
            FeedbackOutcome::Failed {
                stage_id: request.stage_id.clone(),
                message: format!("{err:#}"),
            }
        }
    }
}

/// Check preconditions and forward. No engine call when they fail.
pub async fn submit_feedback<E: Engine>(engine: &E, stage_id: &str, text: &str) -> FeedbackOutcome {
    match FeedbackRequest::capture(stage_id, text) {
        Ok(request) => deliver(engine, &request).await,
        Err(skip) => FeedbackOutcome::skipped(skip),
    }
}

/// The operator's feedback draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackGate {
    draft: String,
}

impl FeedbackGate {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Whether the UI should enable the submit control.
    pub fn can_submit(&self, blocked_stage_id: Option<&str>) -> bool {
        self.capture(blocked_stage_id).is_ok()
    }

    /// Freeze the current draft against the stage id known right now.
    pub fn capture(&self, blocked_stage_id: Option<&str>) -> Result<FeedbackRequest, FeedbackSkip> {
        FeedbackRequest::capture(blocked_stage_id.unwrap_or_default(), &self.draft)
    }

    /// Apply a finished submission to the draft.
    ///
    /// Delivery clears the draft unless the operator edited it while the call
    /// was outstanding. Failures keep it.
    pub fn settle(&mut self, request: &FeedbackRequest, outcome: &FeedbackOutcome) {
        if matches!(outcome, FeedbackOutcome::Delivered { .. }) && self.draft == request.text {
            self.draft.clear();
        }
    }
}
