//! Multi-tool research agent.
//!
//! Dispatches a query to the relevant tools, synthesizes their partial
//! results with a language model and renders a Markdown report.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod report;
pub mod synthesis;

pub use agent::{AgentAnswer, ResearchAgent};
pub use config::Config;
pub use error::{AgentError, AgentResult, SynthesisError};
pub use synthesis::{fallback_synthesis, LlmSynthesizer, Synthesizer};

use secrecy::ExposeSecret;
use std::sync::Arc;
use tools::builtin::{CalculatorTool, WeatherTool, WebSearchTool, WikipediaTool};
use tools::{Tool, ToolRegistry};
use tracing::{debug, info, warn};

/// Build the tool registry described by the configuration.
///
/// Tools switched off in the config are registered but disabled. Web
/// search is left out entirely when no API key is configured.
pub fn build_registry(config: &Config) -> AgentResult<ToolRegistry> {
    let tools_config = &config.tools;
    let mut registry = ToolRegistry::with_default_policy(config.dispatch.tool_policy());

    let web_search_key = tools_config
        .web_search
        .api_key
        .as_ref()
        .map(|key| key.expose_secret().trim().to_string())
        .filter(|key| !key.is_empty());
    match web_search_key {
        Some(key) => add(
            &mut registry,
            Arc::new(WebSearchTool::new(key).with_max_results(tools_config.web_search.max_results)),
            tools_config.web_search.enabled,
        )?,
        None => warn!("No web search API key configured, web_search disabled"),
    }

    add(&mut registry, Arc::new(WeatherTool::new()), tools_config.weather.enabled)?;
    add(&mut registry, Arc::new(CalculatorTool::new()), tools_config.calculator.enabled)?;
    add(
        &mut registry,
        Arc::new(WikipediaTool::new().with_sentences(tools_config.wikipedia.sentences)),
        tools_config.wikipedia.enabled,
    )?;

    info!(
        registered = ?registry.list_tools(),
        enabled = ?registry.list_enabled(),
        "Tool registry ready"
    );
    for (tool, description) in registry.descriptions() {
        debug!(tool, description, "Tool available");
    }
    Ok(registry)
}

fn add(registry: &mut ToolRegistry, tool: Arc<dyn Tool>, enabled: bool) -> AgentResult<()> {
    let name = tool.name().to_string();
    registry.register(tool)?;
    if !enabled {
        registry.disable(&name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        vars.insert("LLM__API_KEY".into(), "sk-test".into());
        Config::from_source(
            ::config::Environment::default()
                .separator("__")
                .source(Some(vars)),
        )
        .unwrap()
    }

    #[test]
    fn test_registry_without_search_key() {
        let registry = build_registry(&config(&[])).unwrap();

        assert_eq!(registry.list_tools(), vec!["weather", "calculator", "wikipedia"]);
        assert!(registry.get("web_search").is_none());
    }

    #[test]
    fn test_registry_with_search_key_and_disabled_tool() {
        let registry = build_registry(&config(&[
            ("TOOLS__WEB_SEARCH__API_KEY", "brave-key"),
            ("TOOLS__WEATHER__ENABLED", "false"),
        ]))
        .unwrap();

        assert_eq!(
            registry.list_tools(),
            vec!["web_search", "weather", "calculator", "wikipedia"]
        );
        assert_eq!(
            registry.list_enabled(),
            vec!["web_search", "calculator", "wikipedia"]
        );
    }

    #[test]
    fn test_registry_describes_enabled_tools() {
        let registry = build_registry(&config(&[("TOOLS__WIKIPEDIA__ENABLED", "false")])).unwrap();
        let descriptions = registry.descriptions();

        let names: Vec<_> = descriptions.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["weather", "calculator"]);
        assert!(descriptions[1].1.contains("compound interest"));
    }

    #[test]
    fn test_blank_search_key_is_ignored() {
        let registry =
            build_registry(&config(&[("TOOLS__WEB_SEARCH__API_KEY", "  ")])).unwrap();
        assert!(!registry.is_enabled("web_search"));
    }
}
