//! Tool capability and registration types.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default per-attempt timeout for a registered tool.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retries after a failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Payload produced by a successful tool execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    /// Text handed to synthesis.
    pub content: String,
    /// How much the tool trusts its own answer, in `[0, 1]`.
    pub confidence: f32,
    /// URLs or labels the content came from.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl ToolOutput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            confidence: 1.0,
            sources: Vec::new(),
        }
    }

    /// Set the confidence, clamped to `[0, 1]`.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }
}

/// Trait for implementing tools.
///
/// A tool is a fixed capability set: a name, a relevance predicate and an
/// execute operation. Timeout and retry policy are attached when the tool
/// is registered (see [`ToolEntry`]).
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (e.g. "weather").
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Whether the tool should run for this query.
    fn is_relevant(&self, query: &str) -> bool;

    /// Execute the tool against the raw query.
    async fn execute(&self, query: &str) -> Result<ToolOutput, ToolError>;
}

/// Per-tool execution policy, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolPolicy {
    /// Limit applied to each attempt.
    pub timeout: Duration,
    /// Re-invocations allowed after a failure. Timeouts are never retried.
    pub max_retries: u32,
}

impl ToolPolicy {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
        }
    }
}

impl Default for ToolPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TIMEOUT, DEFAULT_MAX_RETRIES)
    }
}

/// A registered tool together with its policy.
#[derive(Clone)]
pub struct ToolEntry {
    pub tool: Arc<dyn Tool>,
    pub policy: ToolPolicy,
}

impl ToolEntry {
    pub fn new(tool: Arc<dyn Tool>, policy: ToolPolicy) -> Self {
        Self { tool, policy }
    }

    pub fn name(&self) -> &str {
        self.tool.name()
    }
}

impl fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolEntry")
            .field("name", &self.tool.name())
            .field("policy", &self.policy)
            .finish()
    }
}
