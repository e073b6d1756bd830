//! Application configuration loaded from environment variables.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;
use tools::{DispatcherConfig, ToolPolicy};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Language model configuration
    pub llm: LlmConfig,

    /// Tool dispatch configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Tools configuration
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Agent configuration
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// API key for the chat completion endpoint
    pub api_key: SecretString,

    /// API base URL
    #[serde(default = "default_llm_url")]
    pub base_url: String,

    /// Model used for synthesis
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout
    #[serde(default = "default_llm_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Per-attempt timeout applied to every tool
    #[serde(default = "default_tool_timeout", with = "humantime_serde")]
    pub tool_timeout: Duration,

    /// Retries after a failed attempt (timeouts are never retried)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Wait before the first retry
    #[serde(default = "default_retry_backoff", with = "humantime_serde")]
    pub retry_backoff: Duration,

    /// Maximum number of tools running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// Web search configuration
    #[serde(default)]
    pub web_search: WebSearchConfig,

    /// Weather tool configuration
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Calculator tool configuration
    #[serde(default)]
    pub calculator: CalculatorConfig,

    /// Wikipedia tool configuration
    #[serde(default)]
    pub wikipedia: WikipediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub api_key: Option<SecretString>,
    #[serde(default = "default_search_results")]
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalculatorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WikipediaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Summary sentences kept per article
    #[serde(default = "default_sentences")]
    pub sentences: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Tool run when no tool claims a query; empty disables the fallback
    #[serde(default = "default_fallback_tool")]
    pub fallback_tool: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl DispatchConfig {
    pub fn tool_policy(&self) -> ToolPolicy {
        ToolPolicy::new(self.tool_timeout, self.max_retries)
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_concurrent: self.max_concurrent,
            retry_backoff: self.retry_backoff,
            ..DispatcherConfig::default()
        }
    }
}

impl AgentConfig {
    pub fn fallback_tool(&self) -> Option<&str> {
        let name = self.fallback_tool.trim();
        (!name.is_empty()).then_some(name)
    }
}

// Default implementations
impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tool_timeout: default_tool_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: default_retry_backoff(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            web_search: WebSearchConfig::default(),
            weather: WeatherConfig::default(),
            calculator: CalculatorConfig::default(),
            wikipedia: WikipediaConfig::default(),
        }
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            api_key: None,
            max_results: default_search_results(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            sentences: default_sentences(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            fallback_tool: default_fallback_tool(),
            log_level: default_log_level(),
        }
    }
}

// Default value functions
fn default_llm_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_llm_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_tool_timeout() -> Duration {
    tools::DEFAULT_TOOL_TIMEOUT
}

fn default_max_retries() -> u32 {
    tools::DEFAULT_MAX_RETRIES
}

fn default_retry_backoff() -> Duration {
    Duration::from_secs(1)
}

fn default_max_concurrent() -> usize {
    8
}

fn default_true() -> bool {
    true
}

fn default_search_results() -> usize {
    5
}

fn default_sentences() -> usize {
    3
}

fn default_fallback_tool() -> String {
    "web_search".into()
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_source(config::Environment::default().separator("__"))
    }

    /// Build configuration from an arbitrary source.
    pub fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
