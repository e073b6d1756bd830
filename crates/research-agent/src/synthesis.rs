//! Turning a result bundle into a natural-language answer.

use crate::error::SynthesisError;
use async_trait::async_trait;
use llm_client::{LlmClient, Message};
use std::sync::Arc;
use tools::ResultBundle;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "You are a research assistant. Synthesize the provided information \
into a comprehensive, accurate answer.";

const INSTRUCTIONS: &str = "Please synthesize this information into a comprehensive answer that:
1. Directly answers the original question
2. Combines relevant information from all sources
3. Mentions when information comes from specific sources
4. Notes any contradictions, uncertainties or missing information

Answer:";

/// Answer given when no tool produced anything.
const NOTHING_FOUND: &str = "I wasn't able to find information to answer your question.";

/// Produces the final answer for a query from its tool results.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, query: &str, bundle: &ResultBundle) -> Result<String, SynthesisError>;
}

/// Synthesizer backed by a chat completion model.
pub struct LlmSynthesizer {
    client: Arc<LlmClient>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl LlmSynthesizer {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self {
            client,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[async_trait]
impl Synthesizer for LlmSynthesizer {
    async fn synthesize(&self, query: &str, bundle: &ResultBundle) -> Result<String, SynthesisError> {
        if bundle.success_count() == 0 {
            debug!("No successful results, skipping model call");
            return Ok(best_effort_note(bundle));
        }

        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(build_prompt(query, bundle)),
        ];

        let answer = self
            .client
            .chat_with_retry(messages, self.temperature, self.max_tokens, None)
            .await?;

        info!(model = %self.client.model(), "Synthesized answer");
        Ok(answer)
    }
}

/// User prompt listing every successful fragment and the tools that produced nothing.
pub fn build_prompt(query: &str, bundle: &ResultBundle) -> String {
    let mut prompt = format!("Original question: {}\n\nInformation gathered:\n\n", query);

    for (i, (result, payload)) in bundle.successes().enumerate() {
        prompt.push_str(&format!(
            "{}. From {}:\n{}\n\n",
            i + 1,
            display_name(&result.tool),
            payload.content
        ));
    }

    let unavailable = unavailable_tools(bundle);
    if !unavailable.is_empty() {
        prompt.push_str(&format!(
            "These sources were unavailable: {}\n\n",
            unavailable.join(", ")
        ));
    }

    prompt.push_str(INSTRUCTIONS);
    prompt
}

/// Answer built without a model: one labelled paragraph per successful tool.
pub fn fallback_synthesis(bundle: &ResultBundle) -> String {
    if bundle.success_count() == 0 {
        return best_effort_note(bundle);
    }

    let mut answer = String::from("Based on the available information:\n\n");
    for (result, payload) in bundle.successes() {
        answer.push_str(&format!(
            "**{}:** {}\n\n",
            display_name(&result.tool),
            payload.content
        ));
    }

    let unavailable = unavailable_tools(bundle);
    if !unavailable.is_empty() {
        answer.push_str(&format!(
            "Some information sources were unavailable: {}",
            unavailable.join(", ")
        ));
    }

    answer.trim_end().to_string()
}

fn best_effort_note(bundle: &ResultBundle) -> String {
    if bundle.is_empty() {
        return NOTHING_FOUND.into();
    }
    format!(
        "{} All information sources encountered errors ({}). Please try again later.",
        NOTHING_FOUND,
        unavailable_tools(bundle).join(", ")
    )
}

fn unavailable_tools(bundle: &ResultBundle) -> Vec<String> {
    bundle.failures().map(|r| display_name(&r.tool)).collect()
}

/// `web_search` -> `Web Search`.
pub fn display_name(tool: &str) -> String {
    tool.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tools::{ToolOutcome, ToolOutput, ToolResult};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn success(tool: &str, content: &str) -> ToolResult {
        ToolResult {
            tool: tool.into(),
            outcome: ToolOutcome::Success {
                payload: ToolOutput::new(content).with_confidence(0.9),
            },
            attempts: 1,
            elapsed: Duration::from_millis(10),
        }
    }

    fn failure(tool: &str) -> ToolResult {
        ToolResult {
            tool: tool.into(),
            outcome: ToolOutcome::Failure {
                error: "boom".into(),
            },
            attempts: 3,
            elapsed: Duration::from_millis(10),
        }
    }

    fn mixed_bundle() -> ResultBundle {
        ResultBundle::new(vec![
            success("weather", "Weather in Tokyo: 20.0°C"),
            failure("web_search"),
            success("calculator", "Calculation: 15 / 100 * 40 = 6"),
        ])
    }

    fn client_for(mock_server: &MockServer) -> Arc<LlmClient> {
        Arc::new(
            LlmClient::new("test-key", mock_server.uri(), "test-model", Duration::from_secs(5))
                .unwrap(),
        )
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("web_search"), "Web Search");
        assert_eq!(display_name("calculator"), "Calculator");
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt("weather in Tokyo and 15% tip on $40", &mixed_bundle());

        assert!(prompt.starts_with("Original question: weather in Tokyo and 15% tip on $40"));
        assert!(prompt.contains("1. From Weather:\nWeather in Tokyo: 20.0°C"));
        assert!(prompt.contains("2. From Calculator:\nCalculation: 15 / 100 * 40 = 6"));
        assert!(prompt.contains("These sources were unavailable: Web Search"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_fallback_synthesis() {
        let answer = fallback_synthesis(&mixed_bundle());

        assert!(answer.starts_with("Based on the available information:"));
        assert!(answer.contains("**Weather:** Weather in Tokyo: 20.0°C"));
        assert!(answer.contains("**Calculator:** Calculation: 15 / 100 * 40 = 6"));
        assert!(answer.ends_with("Some information sources were unavailable: Web Search"));
    }

    #[test]
    fn test_fallback_synthesis_without_successes() {
        assert_eq!(fallback_synthesis(&ResultBundle::default()), NOTHING_FOUND);

        let answer = fallback_synthesis(&ResultBundle::new(vec![failure("weather")]));
        assert!(answer.contains("All information sources encountered errors (Weather)"));
    }

    #[tokio::test]
    async fn test_llm_synthesis() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("From Calculator"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "model": "test-model",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "It is 20°C in Tokyo and the tip is $6." },
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let synthesizer = LlmSynthesizer::new(client_for(&mock_server)).with_temperature(0.2);
        let answer = synthesizer
            .synthesize("weather in Tokyo and 15% tip on $40", &mixed_bundle())
            .await
            .unwrap();

        assert_eq!(answer, "It is 20°C in Tokyo and the tip is $6.");
    }

    #[tokio::test]
    async fn test_no_successes_skips_model() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&mock_server)
            .await;

        let synthesizer = LlmSynthesizer::new(client_for(&mock_server));
        let bundle = ResultBundle::new(vec![failure("weather"), failure("wikipedia")]);
        let answer = synthesizer.synthesize("weather in Atlantis", &bundle).await.unwrap();

        assert!(answer.starts_with(NOTHING_FOUND));
        assert!(answer.contains("Weather, Wikipedia"));
    }

    #[tokio::test]
    async fn test_model_error_surfaces() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let synthesizer = LlmSynthesizer::new(client_for(&mock_server));
        let result = synthesizer.synthesize("q", &mixed_bundle()).await;

        assert!(matches!(
            result,
            Err(SynthesisError::Llm(llm_client::LlmError::Unauthorized))
        ));
    }
}
