//! Reduction of the engine's append-only log to the current observable state.
//!
//! Only the most recent event is considered. A later non-blocking event from
//! any stage hides an earlier block, even if that block was never resolved.
//! The engine's log contract does not tell us whether a block is still open,
//! so the reducer does not try to infer it.

use crate::core::classifier::StageStatus;
use crate::core::types::{LogEvent, META_STAGE_ID, META_STAGE_STATUS};

/// What the panel shows for a log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogSummary<'a> {
    pub latest: Option<&'a LogEvent>,
    pub is_blocked: bool,
    /// Set only when `is_blocked` and the event names its stage.
    pub blocked_stage_id: Option<&'a str>,
}

/// Reduce an ordered log. Never fails on missing or malformed metadata.
pub fn reduce(log: &[LogEvent]) -> LogSummary<'_> {
    let latest = log.last();
    let is_blocked = latest
        .and_then(|event| event.meta_str(META_STAGE_STATUS))
        .is_some_and(|status| status == StageStatus::Blocked.as_code());
    let blocked_stage_id = if is_blocked {
        latest
            .and_then(|event| event.meta_str(META_STAGE_ID))
            .filter(|id| !id.is_empty())
    } else {
        None
    };

    LogSummary {
        latest,
        is_blocked,
        blocked_stage_id,
    }
}
