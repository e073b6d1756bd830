//! Tool and dispatch errors.

use thiserror::Error;

/// Errors raised by a single tool execution.
///
/// These never escape the dispatcher; they are recorded in the tool's
/// slot of the [`ResultBundle`](crate::ResultBundle).
#[derive(Error, Debug)]
pub enum ToolError {
    /// The query could not be turned into tool input.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Tool is not configured (missing API key, etc.).
    #[error("Tool not configured: {0}")]
    NotConfigured(String),

    /// External service returned an error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Math evaluation error.
    #[error("Math evaluation error: {0}")]
    MathError(String),

    /// The tool task panicked.
    #[error("Tool panicked: {0}")]
    Panicked(String),
}

/// Caller-input errors that fail a whole dispatch call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),
}
