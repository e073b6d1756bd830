//! Per-tool outcomes and the aggregated result bundle.

use crate::types::ToolOutput;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Outcome tag without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Failure,
    Timeout,
}

/// Terminal outcome of one tool.
///
/// The payload exists only on success and the error detail only on
/// failure or timeout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { payload: ToolOutput },
    Failure { error: String },
    Timeout { error: String },
}

impl ToolOutcome {
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout {
            error: format!("Tool timed out after {:.1} seconds", after.as_secs_f64()),
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success { .. } => OutcomeKind::Success,
            Self::Failure { .. } => OutcomeKind::Failure,
            Self::Timeout { .. } => OutcomeKind::Timeout,
        }
    }

    pub fn payload(&self) -> Option<&ToolOutput> {
        match self {
            Self::Success { payload } => Some(payload),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } | Self::Timeout { error } => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Result slot for one selected tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub tool: String,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
    /// Number of times the tool was invoked.
    pub attempts: u32,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis().min(u64::MAX as u128) as u64)
}

/// All tool results for one query, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultBundle {
    results: Vec<ToolResult>,
}

impl ResultBundle {
    pub fn new(results: Vec<ToolResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ToolResult> {
        self.results.iter()
    }

    /// Look up a tool's slot by name.
    pub fn get(&self, tool: &str) -> Option<&ToolResult> {
        self.results.iter().find(|r| r.tool == tool)
    }

    /// Successful results with their payloads.
    pub fn successes(&self) -> impl Iterator<Item = (&ToolResult, &ToolOutput)> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.payload().map(|p| (r, p)))
    }

    /// Failed and timed-out results.
    pub fn failures(&self) -> impl Iterator<Item = &ToolResult> {
        self.results.iter().filter(|r| !r.outcome.is_success())
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.tool.as_str()).collect()
    }

    /// Mean confidence over successful results.
    pub fn average_confidence(&self) -> Option<f32> {
        let (sum, count) = self
            .successes()
            .fold((0.0f32, 0usize), |(sum, n), (_, p)| (sum + p.confidence, n + 1));
        (count > 0).then(|| sum / count as f32)
    }

    pub fn into_results(self) -> Vec<ToolResult> {
        self.results
    }
}

impl<'a> IntoIterator for &'a ResultBundle {
    type Item = &'a ToolResult;
    type IntoIter = std::slice::Iter<'a, ToolResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
