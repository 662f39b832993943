//! Deterministic classification of raw worker and stage status codes.
//!
//! Every raw code resolves to exactly one category. Unknown codes fall back to
//! the idle category of their domain and are never reported as errors.

use serde::Serialize;

/// Which engine entity a raw code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Worker,
    Stage,
}

/// Color band used by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorBand {
    Gray,
    Purple,
    Amber,
    Blue,
    Green,
    Red,
}

/// Icon class used by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconClass {
    Bot,
    Brain,
    Wrench,
    Spinner,
    AlertCircle,
    MessageSquare,
}

/// Raw worker status codes known to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Initial,
    Thinking,
    Thought,
    ExecutingAction,
    UsingTool,
    Observation,
    FinalAnswer,
    TaskCompleted,
    MaxIterationsError,
    AgenticLoopError,
    WeirdLlmOutput,
}

impl WorkerStatus {
    pub const ALL: [WorkerStatus; 11] = [
        WorkerStatus::Initial,
        WorkerStatus::Thinking,
        WorkerStatus::Thought,
        WorkerStatus::ExecutingAction,
        WorkerStatus::UsingTool,
        WorkerStatus::Observation,
        WorkerStatus::FinalAnswer,
        WorkerStatus::TaskCompleted,
        WorkerStatus::MaxIterationsError,
        WorkerStatus::AgenticLoopError,
        WorkerStatus::WeirdLlmOutput,
    ];

    pub fn as_code(self) -> &'static str {
        match self {
            WorkerStatus::Initial => "INITIAL",
            WorkerStatus::Thinking => "THINKING",
            WorkerStatus::Thought => "THOUGHT",
            WorkerStatus::ExecutingAction => "EXECUTING_ACTION",
            WorkerStatus::UsingTool => "USING_TOOL",
            WorkerStatus::Observation => "OBSERVATION",
            WorkerStatus::FinalAnswer => "FINAL_ANSWER",
            WorkerStatus::TaskCompleted => "TASK_COMPLETED",
            WorkerStatus::MaxIterationsError => "MAX_ITERATIONS_ERROR",
            WorkerStatus::AgenticLoopError => "AGENTIC_LOOP_ERROR",
            WorkerStatus::WeirdLlmOutput => "WEIRD_LLM_OUTPUT",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_code() == code)
    }

    pub fn category(self) -> SemanticCategory {
        match self {
            WorkerStatus::Thinking | WorkerStatus::Thought => SemanticCategory::Thinking,
            WorkerStatus::ExecutingAction | WorkerStatus::UsingTool => SemanticCategory::UsingTool,
            WorkerStatus::Observation => SemanticCategory::Processing,
            WorkerStatus::FinalAnswer | WorkerStatus::TaskCompleted => SemanticCategory::Completed,
            WorkerStatus::MaxIterationsError
            | WorkerStatus::AgenticLoopError
            | WorkerStatus::WeirdLlmOutput => SemanticCategory::Error,
            WorkerStatus::Initial => SemanticCategory::Idle,
        }
    }
}

/// Raw stage status codes known to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Todo,
    Doing,
    Blocked,
    Revise,
    Done,
}

impl StageStatus {
    pub const ALL: [StageStatus; 5] = [
        StageStatus::Todo,
        StageStatus::Doing,
        StageStatus::Blocked,
        StageStatus::Revise,
        StageStatus::Done,
    ];

    pub fn as_code(self) -> &'static str {
        match self {
            StageStatus::Todo => "TODO",
            StageStatus::Doing => "DOING",
            StageStatus::Blocked => "BLOCKED",
            StageStatus::Revise => "REVISE",
            StageStatus::Done => "DONE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_code() == code)
    }

    pub fn category(self) -> StageCategory {
        match self {
            StageStatus::Doing => StageCategory::Doing,
            StageStatus::Blocked => StageCategory::Blocked,
            StageStatus::Revise => StageCategory::Revising,
            StageStatus::Done => StageCategory::Completed,
            StageStatus::Todo => StageCategory::Todo,
        }
    }
}

/// Semantic UI category for a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SemanticCategory {
    Idle,
    Thinking,
    UsingTool,
    Processing,
    Completed,
    Error,
}

impl SemanticCategory {
    pub fn label(self) -> &'static str {
        match self {
            SemanticCategory::Idle => "Idle",
            SemanticCategory::Thinking => "Thinking",
            SemanticCategory::UsingTool => "Using Tool",
            SemanticCategory::Processing => "Processing",
            SemanticCategory::Completed => "Completed",
            SemanticCategory::Error => "Error",
        }
    }

    pub fn color(self) -> ColorBand {
        match self {
            SemanticCategory::Idle => ColorBand::Gray,
            SemanticCategory::Thinking => ColorBand::Purple,
            SemanticCategory::UsingTool => ColorBand::Amber,
            SemanticCategory::Processing => ColorBand::Blue,
            SemanticCategory::Completed => ColorBand::Green,
            SemanticCategory::Error => ColorBand::Red,
        }
    }

    pub fn icon(self) -> IconClass {
        match self {
            SemanticCategory::Idle | SemanticCategory::Completed => IconClass::Bot,
            SemanticCategory::Thinking => IconClass::Brain,
            SemanticCategory::UsingTool => IconClass::Wrench,
            SemanticCategory::Processing => IconClass::Spinner,
            SemanticCategory::Error => IconClass::AlertCircle,
        }
    }
}

/// Semantic UI category for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StageCategory {
    Todo,
    Doing,
    Blocked,
    Revising,
    Completed,
}

impl StageCategory {
    pub fn label(self) -> &'static str {
        match self {
            StageCategory::Todo => "Todo",
            StageCategory::Doing => "Doing",
            StageCategory::Blocked => "Blocked",
            StageCategory::Revising => "Revising",
            StageCategory::Completed => "Completed",
        }
    }

    pub fn color(self) -> ColorBand {
        match self {
            StageCategory::Todo => ColorBand::Gray,
            StageCategory::Doing => ColorBand::Blue,
            StageCategory::Blocked => ColorBand::Amber,
            StageCategory::Revising => ColorBand::Purple,
            StageCategory::Completed => ColorBand::Green,
        }
    }

    pub fn icon(self) -> IconClass {
        match self {
            StageCategory::Todo | StageCategory::Completed => IconClass::Bot,
            StageCategory::Doing => IconClass::Spinner,
            StageCategory::Blocked => IconClass::AlertCircle,
            StageCategory::Revising => IconClass::MessageSquare,
        }
    }

    /// Only `Doing` gets the active treatment.
    pub fn is_active(self) -> bool {
        self == StageCategory::Doing
    }

    /// Border/ring band for stages that need the operator's eye.
    pub fn highlight(self) -> Option<ColorBand> {
        match self {
            StageCategory::Doing | StageCategory::Blocked | StageCategory::Revising => {
                Some(self.color())
            }
            StageCategory::Todo | StageCategory::Completed => None,
        }
    }
}

/// Display-ready classification of one raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub label: &'static str,
    pub color: ColorBand,
    pub icon: IconClass,
    pub active: bool,
}

impl From<SemanticCategory> for Badge {
    fn from(category: SemanticCategory) -> Self {
        Badge {
            label: category.label(),
            color: category.color(),
            icon: category.icon(),
            active: false,
        }
    }
}

impl From<StageCategory> for Badge {
    fn from(category: StageCategory) -> Self {
        Badge {
            label: category.label(),
            color: category.color(),
            icon: category.icon(),
            active: category.is_active(),
        }
    }
}

pub fn classify_worker(code: &str) -> SemanticCategory {
    WorkerStatus::from_code(code).map_or(SemanticCategory::Idle, WorkerStatus::category)
}

pub fn classify_stage(code: &str) -> StageCategory {
    StageStatus::from_code(code).map_or(StageCategory::Todo, StageStatus::category)
}

/// Classify a raw code in either domain. Total: never fails.
pub fn classify(code: &str, domain: Domain) -> Badge {
    match domain {
        Domain::Worker => classify_worker(code).into(),
        Domain::Stage => classify_stage(code).into(),
    }
}

/// A worker is active unless it has not started or has finished its answer.
pub fn worker_is_active(code: &str) -> bool {
    !matches!(
        WorkerStatus::from_code(code),
        Some(WorkerStatus::Initial | WorkerStatus::FinalAnswer | WorkerStatus::TaskCompleted)
    )
}

/// Status dot color shown next to a worker's humanized code.
///
/// Error codes win over activity so a failed worker never shows as busy.
pub fn worker_indicator(code: &str) -> ColorBand {
    if code.contains("ERROR") {
        ColorBand::Red
    } else if worker_is_active(code) {
        ColorBand::Blue
    } else if classify_worker(code) == SemanticCategory::Completed {
        ColorBand::Green
    } else {
        ColorBand::Gray
    }
}

/// Render a raw code as text: `MAX_ITERATIONS_ERROR` -> `Max Iterations Error`.
///
/// Each underscore-separated token keeps its first character and lower-cases
/// the rest.
pub fn humanize_code(code: &str) -> String {
    code.split('_')
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => {
                    let mut word = String::with_capacity(token.len());
                    word.push(first);
                    word.push_str(&chars.as_str().to_lowercase());
                    word
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_codes_map_exhaustively() {
        let expected = [
            ("INITIAL", SemanticCategory::Idle),
            ("THINKING", SemanticCategory::Thinking),
            ("THOUGHT", SemanticCategory::Thinking),
            ("EXECUTING_ACTION", SemanticCategory::UsingTool),
            ("USING_TOOL", SemanticCategory::UsingTool),
            ("OBSERVATION", SemanticCategory::Processing),
            ("FINAL_ANSWER", SemanticCategory::Completed),
            ("TASK_COMPLETED", SemanticCategory::Completed),
            ("MAX_ITERATIONS_ERROR", SemanticCategory::Error),
            ("AGENTIC_LOOP_ERROR", SemanticCategory::Error),
            ("WEIRD_LLM_OUTPUT", SemanticCategory::Error),
        ];
        assert_eq!(expected.len(), WorkerStatus::ALL.len());
        for status in WorkerStatus::ALL {
            let (_, category) = expected
                .iter()
                .find(|(code, _)| *code == status.as_code())
                .expect("every known code has an expectation");
            assert_eq!(classify_worker(status.as_code()), *category, "{:?}", status);
        }
    }

    #[test]
    fn unknown_worker_codes_are_idle() {
        for code in ["", "IDLE", "thinking", "SOMETHING_ELSE", "TODO"] {
            assert_eq!(classify_worker(code), SemanticCategory::Idle, "{code}");
        }
    }

    #[test]
    fn stage_codes_map_distinctly() {
        assert_eq!(classify_stage("BLOCKED"), StageCategory::Blocked);
        assert_eq!(classify_stage("REVISE"), StageCategory::Revising);
        assert_eq!(classify_stage("DOING"), StageCategory::Doing);
        assert_eq!(classify_stage("DONE"), StageCategory::Completed);
        assert_eq!(classify_stage("TODO"), StageCategory::Todo);
        assert_eq!(classify_stage("AWAITING_VALIDATION"), StageCategory::Todo);

        let mut labels: Vec<&str> = StageStatus::ALL
            .into_iter()
            .map(|status| status.category().label())
            .collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), StageStatus::ALL.len());
    }

    #[test]
    fn stage_badges_carry_color_and_activity() {
        let blocked = classify("BLOCKED", Domain::Stage);
        assert_eq!(blocked.label, "Blocked");
        assert_eq!(blocked.color, ColorBand::Amber);
        assert!(!blocked.active);

        let doing = classify("DOING", Domain::Stage);
        assert_eq!(doing.color, ColorBand::Blue);
        assert!(doing.active);

        assert_eq!(classify("REVISE", Domain::Stage).color, ColorBand::Purple);
        assert_eq!(classify("unknown", Domain::Stage).label, "Todo");
        assert_eq!(StageCategory::Todo.highlight(), None);
        assert_eq!(StageCategory::Blocked.highlight(), Some(ColorBand::Amber));
    }

    #[test]
    fn same_code_classifies_per_domain() {
        assert_eq!(classify("DONE", Domain::Worker).label, "Idle");
        assert_eq!(classify("DONE", Domain::Stage).label, "Completed");
        assert_eq!(classify("THINKING", Domain::Stage).label, "Todo");
    }

    #[test]
    fn worker_activity_and_indicator() {
        assert!(!worker_is_active("INITIAL"));
        assert!(!worker_is_active("FINAL_ANSWER"));
        assert!(!worker_is_active("TASK_COMPLETED"));
        assert!(worker_is_active("THINKING"));
        // Error and unknown codes still count as active, matching the engine's view.
        assert!(worker_is_active("MAX_ITERATIONS_ERROR"));
        assert!(worker_is_active("IDLE"));

        assert_eq!(worker_indicator("USING_TOOL"), ColorBand::Blue);
        assert_eq!(worker_indicator("TASK_COMPLETED"), ColorBand::Green);
        assert_eq!(worker_indicator("INITIAL"), ColorBand::Gray);
        assert_eq!(worker_indicator("AGENTIC_LOOP_ERROR"), ColorBand::Red);
    }

    #[test]
    fn humanize_splits_on_underscores() {
        assert_eq!(humanize_code("MAX_ITERATIONS_ERROR"), "Max Iterations Error");
        assert_eq!(humanize_code("THINKING"), "Thinking");
        assert_eq!(humanize_code("WEIRD_LLM_OUTPUT"), "Weird Llm Output");
        assert_eq!(humanize_code(""), "");
    }
}
