//! Bounded operator-visible error channel.

use std::collections::VecDeque;

use serde::Serialize;

/// Which operator action produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    RunStart,
    Feedback,
    Settings,
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorError {
    pub source: ErrorSource,
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub at_ms: i64,
}

/// FIFO of recent errors; the oldest entry is dropped once `limit` is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorChannel {
    limit: usize,
    entries: VecDeque<OperatorError>,
}

impl ErrorChannel {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, error: OperatorError) {
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(error);
    }

    pub fn entries(&self) -> impl Iterator<Item = &OperatorError> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&OperatorError> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(at_ms: i64) -> OperatorError {
        OperatorError {
            source: ErrorSource::Feedback,
            message: format!("failure {at_ms}"),
            at_ms,
        }
    }

    #[test]
    fn oldest_entries_are_dropped() {
        let mut channel = ErrorChannel::new(2);
        channel.push(error(1));
        channel.push(error(2));
        channel.push(error(3));
        let kept: Vec<i64> = channel.entries().map(|entry| entry.at_ms).collect();
        assert_eq!(kept, vec![2, 3]);
        assert_eq!(channel.latest().map(|entry| entry.at_ms), Some(3));
    }

    #[test]
    fn zero_limit_still_keeps_latest() {
        let mut channel = ErrorChannel::new(0);
        channel.push(error(1));
        channel.push(error(2));
        assert_eq!(channel.len(), 1);
    }
}
