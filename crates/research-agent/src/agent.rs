//! The research pipeline: dispatch, fallback, synthesis and report.

use crate::error::AgentResult;
use crate::report;
use crate::synthesis::{fallback_synthesis, Synthesizer};
use std::sync::Arc;
use tools::{Dispatcher, ResultBundle, ToolRegistry};
use tracing::{info, instrument, warn};

/// Everything produced for one query.
#[derive(Debug, Clone)]
pub struct AgentAnswer {
    pub bundle: ResultBundle,
    pub answer: String,
    pub report: String,
}

pub struct ResearchAgent {
    registry: ToolRegistry,
    dispatcher: Dispatcher,
    synthesizer: Arc<dyn Synthesizer>,
    fallback_tool: Option<String>,
}

impl ResearchAgent {
    pub fn new(
        registry: ToolRegistry,
        dispatcher: Dispatcher,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            synthesizer,
            fallback_tool: None,
        }
    }

    /// Tool to run when no registered tool claims a query.
    pub fn with_fallback_tool(mut self, name: impl Into<String>) -> Self {
        self.fallback_tool = Some(name.into());
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer a query.
    ///
    /// Fails only on caller input errors. Tool failures end up in the
    /// bundle and a failed synthesis falls back to plain concatenation.
    #[instrument(skip(self))]
    pub async fn answer(&self, query: &str) -> AgentResult<AgentAnswer> {
        let entries = self.registry.entries();
        let mut bundle = self.dispatcher.dispatch(query, &entries).await?;

        if bundle.is_empty() {
            bundle = self.run_fallback(query).await?;
        }

        let answer = match self.synthesizer.synthesize(query, &bundle).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Synthesis failed, using plain summary: {}", e);
                fallback_synthesis(&bundle)
            }
        };

        let report = report::render(query, &bundle, &answer, chrono::Utc::now());

        Ok(AgentAnswer {
            bundle,
            answer,
            report,
        })
    }

    async fn run_fallback(&self, query: &str) -> AgentResult<ResultBundle> {
        let Some(name) = self.fallback_tool.as_deref() else {
            return Ok(ResultBundle::default());
        };

        match self.registry.get(name) {
            Some(entry) => {
                info!(tool = %name, "No relevant tools, running fallback");
                Ok(self
                    .dispatcher
                    .execute_all(query, std::slice::from_ref(entry))
                    .await?)
            }
            None => {
                warn!(tool = %name, "Fallback tool is not registered or disabled");
                Ok(ResultBundle::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AgentError, SynthesisError};
    use crate::synthesis::MockSynthesizer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tools::{DispatchError, OutcomeKind, Tool, ToolError, ToolOutput, ToolPolicy};

    struct KeywordTool {
        name: &'static str,
        keyword: &'static str,
        fail: bool,
        calls: AtomicU32,
    }

    impl KeywordTool {
        fn new(name: &'static str, keyword: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                keyword,
                fail: false,
                calls: AtomicU32::new(0),
            })
        }

        fn failing(name: &'static str, keyword: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                keyword,
                fail: true,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Tool for KeywordTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "test tool"
        }

        fn is_relevant(&self, query: &str) -> bool {
            query.to_lowercase().contains(self.keyword)
        }

        async fn execute(&self, query: &str) -> Result<ToolOutput, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ToolError::ExternalService("down".into()));
            }
            Ok(ToolOutput::new(format!("{} answered '{}'", self.name, query)).with_confidence(0.8))
        }
    }

    fn registry(tools: Vec<Arc<KeywordTool>>) -> ToolRegistry {
        let mut registry =
            ToolRegistry::with_default_policy(ToolPolicy::new(Duration::from_secs(1), 0));
        for tool in tools {
            registry.register(tool).unwrap();
        }
        registry
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::default().with_retry_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_answer_uses_synthesizer() {
        let mut synthesizer = MockSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .withf(|query, bundle| query.eq_ignore_ascii_case("weather and tip") && bundle.len() == 2)
            .times(1)
            .returning(|_, _| Ok("synthesized".into()));

        let agent = ResearchAgent::new(
            registry(vec![
                KeywordTool::new("weather", "weather"),
                KeywordTool::new("calculator", "tip"),
                KeywordTool::new("wikipedia", "who"),
            ]),
            dispatcher(),
            Arc::new(synthesizer),
        );

        let answer = agent.answer("weather and tip").await.unwrap();

        assert_eq!(answer.answer, "synthesized");
        assert!(answer.bundle.get("wikipedia").is_none());
        assert!(answer.report.contains("## Summary\nsynthesized"));
    }

    #[tokio::test]
    async fn test_fallback_tool_runs_when_nothing_matches() {
        let search = KeywordTool::new("web_search", "latest");
        let mut synthesizer = MockSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .withf(|_, bundle| bundle.tool_names() == vec!["web_search"])
            .returning(|_, _| Ok("from search".into()));

        let agent = ResearchAgent::new(
            registry(vec![KeywordTool::new("weather", "weather"), search.clone()]),
            dispatcher(),
            Arc::new(synthesizer),
        )
        .with_fallback_tool("web_search");

        let answer = agent.answer("something nobody claims").await.unwrap();

        assert_eq!(answer.bundle.len(), 1);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        assert_eq!(answer.answer, "from search");
    }

    #[tokio::test]
    async fn test_disabled_fallback_tool_is_skipped() {
        let search = KeywordTool::new("web_search", "latest");
        let mut registry = registry(vec![search.clone()]);
        registry.disable("web_search");

        let mut synthesizer = MockSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .withf(|_, bundle| bundle.is_empty())
            .returning(|_, _| Ok("nothing".into()));

        let agent = ResearchAgent::new(registry, dispatcher(), Arc::new(synthesizer))
            .with_fallback_tool("web_search");

        let answer = agent.answer("something nobody claims").await.unwrap();

        assert!(answer.bundle.is_empty());
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_synthesis_error_falls_back() {
        let mut synthesizer = MockSynthesizer::new();
        synthesizer.expect_synthesize().returning(|_, _| {
            Err(SynthesisError::Llm(llm_client::LlmError::RateLimit))
        });

        let agent = ResearchAgent::new(
            registry(vec![
                KeywordTool::new("weather", "weather"),
                KeywordTool::failing("calculator", "tip"),
            ]),
            dispatcher(),
            Arc::new(synthesizer),
        );

        let answer = agent.answer("weather and tip").await.unwrap();

        assert_eq!(
            answer.bundle.get("calculator").map(|r| r.outcome.kind()),
            Some(OutcomeKind::Failure)
        );
        assert!(answer.answer.contains("**Weather:** weather answered 'weather and tip'"));
        assert!(answer.answer.contains("unavailable: Calculator"));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let mut synthesizer = MockSynthesizer::new();
        synthesizer.expect_synthesize().times(0);

        let agent = ResearchAgent::new(
            registry(vec![KeywordTool::new("weather", "weather")]),
            dispatcher(),
            Arc::new(synthesizer),
        );

        let result = agent.answer("   ").await;
        assert!(matches!(
            result,
            Err(AgentError::Dispatch(DispatchError::EmptyQuery))
        ));
    }
}
