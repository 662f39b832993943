//! Preconditions for operator feedback on a blocked stage.

use std::fmt;

/// Why a feedback submission was skipped. No engine call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackSkip {
    /// No blocked stage id was available when the operator submitted.
    NoBlockedStage,
    /// Text is empty after trimming whitespace.
    EmptyText,
}

impl fmt::Display for FeedbackSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackSkip::NoBlockedStage => f.write_str("no blocked stage to send feedback to"),
            FeedbackSkip::EmptyText => f.write_str("feedback text is empty"),
        }
    }
}

/// Feedback addressed to the stage id captured at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRequest {
    pub stage_id: String,
    /// Sent verbatim; trimming is only used for the emptiness check.
    pub text: String,
}

impl FeedbackRequest {
    pub fn capture(stage_id: &str, text: &str) -> Result<Self, FeedbackSkip> {
        if stage_id.is_empty() {
            return Err(FeedbackSkip::NoBlockedStage);
        }
        if text.trim().is_empty() {
            return Err(FeedbackSkip::EmptyText);
        }
        Ok(Self {
            stage_id: stage_id.to_string(),
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stage_id_is_skipped() {
        assert_eq!(
            FeedbackRequest::capture("", "hello"),
            Err(FeedbackSkip::NoBlockedStage)
        );
    }

    #[test]
    fn whitespace_text_is_skipped() {
        assert_eq!(
            FeedbackRequest::capture("t1", "   \n\t"),
            Err(FeedbackSkip::EmptyText)
        );
    }

    #[test]
    fn text_is_kept_verbatim() {
        let request = FeedbackRequest::capture("t1", "  use the archive page ").expect("capture");
        assert_eq!(request.stage_id, "t1");
        assert_eq!(request.text, "  use the archive page ");
    }
}
