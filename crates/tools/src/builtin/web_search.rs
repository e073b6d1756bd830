//! Web search tool using Brave Search API.

use super::keywords::mentions_any;
use crate::error::ToolError;
use crate::types::{Tool, ToolOutput};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.search.brave.com/res/v1";

const SEARCH_KEYWORDS: &[&str] = &[
    "news", "current", "currently", "recent", "recently", "latest", "today", "now", "this week",
    "what is", "who is", "when did", "how to", "search", "look up", "price", "stock",
];

/// Web search tool using Brave Search API.
pub struct WebSearchTool {
    client: Client,
    api_key: SecretString,
    base_url: String,
    max_results: usize,
}

#[derive(Deserialize)]
struct BraveSearchResponse {
    web: Option<WebResults>,
}

#[derive(Deserialize)]
struct WebResults {
    results: Vec<WebResult>,
}

#[derive(Deserialize)]
struct WebResult {
    title: String,
    url: String,
    description: Option<String>,
}

impl WebSearchTool {
    /// Create a new web search tool with Brave API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::new(api_key.into()),
            base_url: DEFAULT_BASE_URL.into(),
            max_results: 5,
        }
    }

    /// Set maximum number of results to return.
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information, news, prices and recent events."
    }

    fn is_relevant(&self, query: &str) -> bool {
        mentions_any(&query.to_lowercase(), SEARCH_KEYWORDS)
    }

    async fn execute(&self, query: &str) -> Result<ToolOutput, ToolError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidQuery("Empty query".into()));
        }

        if self.api_key.expose_secret().is_empty() {
            return Err(ToolError::NotConfigured("Brave Search API key is empty".into()));
        }

        debug!(query = %query, "Performing web search");

        let count = self.max_results.to_string();
        let response = self
            .client
            .get(format!("{}/web/search", self.base_url))
            .header("X-Subscription-Token", self.api_key.expose_secret())
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ToolError::RateLimit);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::ExternalService(format!(
                "Brave Search API error: {} - {}",
                status, body
            )));
        }

        let search_response: BraveSearchResponse = response.json().await?;

        let results = search_response
            .web
            .map(|w| w.results)
            .unwrap_or_default();

        if results.is_empty() {
            return Ok(ToolOutput::new(format!("No results found for '{}'", query))
                .with_confidence(0.1));
        }

        // Format results
        let mut content = format!("Search results for '{}':\n\n", query);
        let mut output = ToolOutput::new("").with_confidence(0.8);
        for (i, result) in results.iter().take(self.max_results).enumerate() {
            content.push_str(&format!("{}. {}\n", i + 1, result.title));
            if let Some(desc) = &result.description {
                content.push_str(&format!("   {}\n", desc));
            }
            content.push_str(&format!("   URL: {}\n\n", result.url));
            output = output.with_source(&result.url);
        }
        output.content = content.trim_end().to_string();

        Ok(output)
    }
}
