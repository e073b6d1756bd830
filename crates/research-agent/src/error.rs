//! Application error types.

use thiserror::Error;

/// Main application error type.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Invalid query: {0}")]
    Dispatch(#[from] tools::DispatchError),

    #[error("LLM error: {0}")]
    Llm(#[from] llm_client::LlmError),
}

/// Failure to turn a bundle into prose.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("LLM error: {0}")]
    Llm(#[from] llm_client::LlmError),
}

/// Result type alias for application errors.
pub type AgentResult<T> = Result<T, AgentError>;
