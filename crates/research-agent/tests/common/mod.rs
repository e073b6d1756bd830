//! Common test utilities for integration tests.

use llm_client::LlmClient;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Create an LLM client configured for a mock server.
pub fn test_llm_client(mock_server: &MockServer) -> Arc<LlmClient> {
    Arc::new(
        LlmClient::new(
            "test-api-key",
            mock_server.uri(),
            "test-model",
            Duration::from_secs(5),
        )
        .unwrap(),
    )
}

/// Answer every chat completion with `content`.
pub async fn mount_completion(mock_server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-123",
            "model": "test-model",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })))
        .mount(mock_server)
        .await;
}

/// Open-Meteo stand-in that knows only Tokyo.
pub async fn mount_tokyo_weather(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "name": "Tokyo",
                "latitude": 35.69,
                "longitude": 139.69,
                "country": "Japan"
            }]
        })))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current_weather": { "temperature": 18.0, "windspeed": 7.0, "weathercode": 2 }
        })))
        .mount(mock_server)
        .await;
}
