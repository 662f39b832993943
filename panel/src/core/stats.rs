//! Post-run statistics aggregation and presentation.

use serde::Serialize;

use crate::core::types::{RunResult, RunStatus};

/// Aggregate metrics for one finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayStats {
    pub duration: f64,
    pub total_token_count: u64,
    pub total_cost: f64,
}

impl DisplayStats {
    /// Duration with two decimals, e.g. `12.35s`.
    pub fn duration_label(&self) -> String {
        format!("{:.2}s", self.duration)
    }

    /// Token count with thousands separators, e.g. `1,234`.
    pub fn tokens_label(&self) -> String {
        group_thousands(self.total_token_count)
    }

    /// Cost with four decimals, e.g. `$0.0123`.
    pub fn cost_label(&self) -> String {
        format!("${:.4}", self.total_cost)
    }
}

/// Aggregate a terminal result. `None` unless the run finished with stats.
pub fn aggregate(result: &RunResult) -> Option<DisplayStats> {
    if result.status != RunStatus::Finished {
        return None;
    }
    let stats = result.stats.as_ref()?;
    Some(DisplayStats {
        duration: stats.duration_seconds,
        total_token_count: stats
            .llm_usage
            .input_tokens
            .saturating_add(stats.llm_usage.output_tokens),
        total_cost: stats.cost_details.total_cost,
    })
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
