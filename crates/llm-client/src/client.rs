//! HTTP client for OpenAI-compatible chat completion endpoints.

use crate::error::LlmError;
use crate::types::*;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

const DEFAULT_MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_millis(5000);

/// Chat completion client.
///
/// Cheap to clone; the API key never appears in `Debug` output or logs.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl LlmClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: SecretString::new(api_key.into()),
            model: model.into(),
        })
    }

    /// Model used for every completion.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat completion request and return the first choice's text.
    #[instrument(skip(self, messages), fields(message_count = messages.len(), model = %self.model))]
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .request(Method::POST, "/chat/completions")
            .json(&request)
            .send()
            .await?;
        let completion: ChatResponse = parse(response).await?;

        if let Some(usage) = &completion.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    /// [`chat`](Self::chat) with exponential backoff on transient errors.
    ///
    /// `max_retries` defaults to 3. Authentication failures and empty
    /// responses are returned immediately.
    #[instrument(skip(self, messages), fields(message_count = messages.len()))]
    pub async fn chat_with_retry(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
        max_retries: Option<u32>,
    ) -> Result<String, LlmError> {
        let max_retries = max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0;

        loop {
            match self.chat(messages.clone(), temperature, max_tokens).await {
                Ok(answer) => return Ok(answer),
                Err(e) if !e.is_transient() || attempt >= max_retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    warn!(attempt, backoff = ?backoff, error = %e, "Completion failed, retrying");
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    /// Models served by the endpoint.
    #[instrument(skip(self))]
    pub async fn list_models(&self) -> Result<Vec<Model>, LlmError> {
        let response = self.request(Method::GET, "/models").send().await?;
        let models: ModelsResponse = parse(response).await?;
        Ok(models.data)
    }

    /// True if the endpoint answers an authenticated model listing.
    pub async fn health_check(&self) -> bool {
        match self.list_models().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(self.api_key.expose_secret())
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, LlmError> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_for(status, response).await);
    }

    let body = response.text().await?;
    debug!(body = %body.chars().take(200).collect::<String>(), "Response received");
    Ok(serde_json::from_str(&body)?)
}

async fn error_for(status: StatusCode, response: Response) -> LlmError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("Rate limit exceeded");
            LlmError::RateLimit
        }
        StatusCode::UNAUTHORIZED => {
            warn!("Authentication failed");
            LlmError::Unauthorized
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            // OpenAI-style `{"error": {"message": ...}}` bodies are unwrapped.
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            LlmError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}
