//! Research Agent - one-shot command line entry point.

use anyhow::Context;
use llm_client::LlmClient;
use research_agent::cli::{parse_args, Command, USAGE};
use research_agent::config::Config;
use research_agent::error::AgentResult;
use research_agent::{build_registry, report, AgentError, LlmSynthesizer, ResearchAgent};
use secrecy::ExposeSecret;
use std::process::ExitCode;
use std::sync::Arc;
use tools::Dispatcher;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> AgentResult<ExitCode> {
    let (query, json) = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return Ok(ExitCode::SUCCESS);
        }
        Ok(Command::Ask { query, json }) => (query, json),
        Err(e) => {
            println!("{}", report::render_error("", &e.to_string()));
            eprintln!("{}", USAGE);
            return Ok(ExitCode::FAILURE);
        }
    };

    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.agent.log_level);

    info!("Starting Research Agent...");

    let llm = Arc::new(
        LlmClient::new(
            config.llm.api_key.expose_secret().as_str(),
            &config.llm.base_url,
            &config.llm.model,
            config.llm.timeout,
        )
        .context("Failed to create LLM client")?,
    );

    // Health check
    if llm.health_check().await {
        info!("LLM endpoint healthy - Model: {}", config.llm.model);
    } else {
        warn!("LLM health check failed - answers may fall back to plain summaries");
    }

    let registry = build_registry(&config)?;
    let dispatcher = Dispatcher::new(config.dispatch.dispatcher_config());
    let synthesizer = LlmSynthesizer::new(llm)
        .with_temperature(config.llm.temperature)
        .with_max_tokens(config.llm.max_tokens);

    let mut agent = ResearchAgent::new(registry, dispatcher, Arc::new(synthesizer));
    if let Some(fallback) = config.agent.fallback_tool() {
        agent = agent.with_fallback_tool(fallback);
    }

    match agent.answer(&query).await {
        Ok(answer) if json => {
            let body = serde_json::to_string_pretty(&answer.bundle)
                .context("Failed to serialize result bundle")?;
            println!("{}", body);
            Ok(ExitCode::SUCCESS)
        }
        Ok(answer) => {
            println!("{}", answer.report);
            Ok(ExitCode::SUCCESS)
        }
        Err(AgentError::Dispatch(e)) => {
            error!("Rejected query: {}", e);
            println!("{}", report::render_error(&query, &e.to_string()));
            eprintln!("{}", USAGE);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
