//! Concurrent tool dispatch with per-tool timeout and retry.

use crate::bundle::{ResultBundle, ToolOutcome, ToolResult};
use crate::error::{DispatchError, ToolError};
use crate::types::{ToolEntry, ToolOutput};
use futures::{stream, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{error, info, instrument, warn};

const DEFAULT_MAX_CONCURRENT: usize = 8;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;
const DEFAULT_MAX_BACKOFF_MS: u64 = 5000;

/// Dispatcher settings shared by every dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Upper bound on tools running at once.
    pub max_concurrent: usize,
    /// Wait before the first retry; doubles per attempt.
    pub retry_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

/// Runs relevant tools for a query and collects every outcome.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: DispatcherConfig,
}

/// Outcome of a single attempt, before retry policy is applied.
enum Attempt {
    Done(Result<ToolOutput, ToolError>),
    TimedOut,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }

    /// Set the concurrency bound.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.config.max_concurrent = max;
        self
    }

    /// Set the initial retry backoff.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.config.retry_backoff = backoff;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Select the tools relevant to `query` and run them concurrently.
    ///
    /// Returns one result per selected tool. An empty bundle means no tool
    /// claimed the query; the caller decides on a fallback. Only caller
    /// input (empty query, duplicate tool names) fails the call.
    #[instrument(skip(self, tools), fields(tool_count = tools.len()))]
    pub async fn dispatch(
        &self,
        query: &str,
        tools: &[ToolEntry],
    ) -> Result<ResultBundle, DispatchError> {
        let query = validate(query, tools)?;

        let selected: Vec<&ToolEntry> = tools
            .iter()
            .filter(|entry| entry.tool.is_relevant(query))
            .collect();

        if selected.is_empty() {
            info!("No relevant tools for query");
            return Ok(ResultBundle::default());
        }

        let names: Vec<&str> = selected.iter().map(|e| e.name()).collect();
        info!(tools = ?names, "Selected tools");

        Ok(self.run(query, selected).await)
    }

    /// Run every given tool, skipping the relevance check.
    #[instrument(skip(self, tools), fields(tool_count = tools.len()))]
    pub async fn execute_all(
        &self,
        query: &str,
        tools: &[ToolEntry],
    ) -> Result<ResultBundle, DispatchError> {
        let query = validate(query, tools)?;
        Ok(self.run(query, tools.iter().collect()).await)
    }

    async fn run(&self, query: &str, selected: Vec<&ToolEntry>) -> ResultBundle {
        let started = Instant::now();
        let limit = self.config.max_concurrent.max(1);
        let mut results = Vec::with_capacity(selected.len());

        // Single aggregation point: results are pushed as they complete.
        let mut completions = stream::iter(selected)
            .map(|entry| self.run_tool(entry, query))
            .buffer_unordered(limit);
        while let Some(result) = completions.next().await {
            results.push(result);
        }

        let bundle = ResultBundle::new(results);
        info!(
            total = bundle.len(),
            succeeded = bundle.success_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dispatch complete"
        );
        bundle
    }

    async fn run_tool(&self, entry: &ToolEntry, query: &str) -> ToolResult {
        let name = entry.name();
        let started = Instant::now();
        let mut backoff = self.config.retry_backoff;
        let mut attempts = 0u32;

        let outcome = loop {
            attempts += 1;
            match attempt(entry, query).await {
                Attempt::Done(Ok(payload)) => {
                    info!(tool = %name, attempts, "Tool executed successfully");
                    break ToolOutcome::Success { payload };
                }
                Attempt::TimedOut => {
                    warn!(tool = %name, attempts, timeout = ?entry.policy.timeout, "Tool timed out");
                    break ToolOutcome::timeout(entry.policy.timeout);
                }
                Attempt::Done(Err(e)) if attempts <= entry.policy.max_retries => {
                    warn!(tool = %name, attempt = attempts, error = %e, "Tool failed, retrying");
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
                Attempt::Done(Err(e)) => {
                    error!(tool = %name, attempts, error = %e, "Tool execution failed");
                    break ToolOutcome::Failure {
                        error: e.to_string(),
                    };
                }
            }
        };

        ToolResult {
            tool: name.to_string(),
            outcome,
            attempts,
            elapsed: started.elapsed(),
        }
    }
}

/// Run one attempt on its own task.
///
/// On timeout the task is detached rather than aborted; whatever it
/// eventually returns is dropped.
async fn attempt(entry: &ToolEntry, query: &str) -> Attempt {
    let tool = Arc::clone(&entry.tool);
    let query = query.to_owned();
    let handle = tokio::spawn(async move { tool.execute(&query).await });

    match timeout(entry.policy.timeout, handle).await {
        Ok(Ok(result)) => Attempt::Done(result),
        Ok(Err(join_err)) => Attempt::Done(Err(ToolError::Panicked(join_err.to_string()))),
        Err(_) => Attempt::TimedOut,
    }
}

fn validate<'q>(query: &'q str, tools: &[ToolEntry]) -> Result<&'q str, DispatchError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(DispatchError::EmptyQuery);
    }

    let mut seen = HashSet::new();
    for entry in tools {
        if !seen.insert(entry.name()) {
            return Err(DispatchError::DuplicateTool(entry.name().to_string()));
        }
    }

    Ok(query)
}
