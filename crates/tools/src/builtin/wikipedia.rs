//! Wikipedia tool using the MediaWiki search API and REST page summaries.

use super::keywords::mentions_any;
use crate::error::ToolError;
use crate::types::{Tool, ToolOutput};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";
const DEFAULT_REST_URL: &str = "https://en.wikipedia.org/api/rest_v1";
const USER_AGENT: &str = concat!("research-agent/", env!("CARGO_PKG_VERSION"));

const QUESTION_WORDS: &[&str] = &["who", "what", "when", "where", "why", "how"];

const WIKI_KEYWORDS: &[&str] = &[
    "history of", "biography", "definition", "meaning", "explain", "information about",
    "tell me about", "facts about", "born", "died", "founded", "invented", "discovered",
    "created",
];

/// Queries about live data or arithmetic are better served elsewhere.
const AVOID_KEYWORDS: &[&str] = &["calculate", "weather", "temperature", "current", "today", "now"];

/// Lead-ins stripped before searching.
const LEAD_INS: &[&str] = &[
    "who is", "who was", "who were", "what is", "what was", "what are", "what were",
    "tell me about", "information about", "facts about", "history of", "biography of",
    "the history of", "explain", "define", "the meaning of", "the definition of",
];

/// Wikipedia lookup tool.
pub struct WikipediaTool {
    client: Client,
    api_url: String,
    rest_url: String,
    sentences: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Deserialize)]
struct PageSummary {
    title: String,
    #[serde(default)]
    extract: String,
    content_urls: Option<ContentUrls>,
}

#[derive(Deserialize)]
struct ContentUrls {
    desktop: PageUrl,
}

#[derive(Deserialize)]
struct PageUrl {
    page: String,
}

impl WikipediaTool {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_url: DEFAULT_API_URL.into(),
            rest_url: DEFAULT_REST_URL.into(),
            sentences: 3,
        }
    }

    /// Number of summary sentences to keep (0 keeps the whole extract).
    pub fn with_sentences(mut self, sentences: usize) -> Self {
        self.sentences = sentences;
        self
    }

    /// Point the tool at another MediaWiki deployment.
    pub fn with_base_urls(mut self, api_url: impl Into<String>, rest_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.rest_url = rest_url.into();
        self
    }

    /// Reduce a question to the subject worth searching for.
    fn search_terms(query: &str) -> &str {
        let mut text = query.trim();
        loop {
            let stripped = LEAD_INS.iter().find_map(|lead| {
                text.get(..lead.len())
                    .filter(|head| head.eq_ignore_ascii_case(lead))
                    .and_then(|_| text.get(lead.len()..))
            });
            match stripped {
                Some(rest) if rest.is_empty() || rest.starts_with(' ') => text = rest.trim_start(),
                _ => break,
            }
        }

        for article in ["a ", "an ", "the "] {
            if text.get(..article.len()).is_some_and(|h| h.eq_ignore_ascii_case(article)) {
                text = &text[article.len()..];
                break;
            }
        }

        let text = text.trim_end_matches(|c: char| matches!(c, '?' | '!' | '.')).trim();
        if text.is_empty() {
            query.trim()
        } else {
            text
        }
    }

    async fn search(&self, terms: &str) -> Result<Vec<String>, ToolError> {
        let response = self
            .client
            .get(&self.api_url)
            .header("User-Agent", USER_AGENT)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", terms),
                ("srlimit", "5"),
                ("format", "json"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::ExternalService(format!(
                "Wikipedia search error: {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }

    async fn summary(&self, title: &str) -> Result<PageSummary, ToolError> {
        let url = format!(
            "{}/page/summary/{}",
            self.rest_url,
            urlencoding::encode(&title.replace(' ', "_"))
        );

        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ToolError::ExternalService(format!(
                "Wikipedia page '{}' not found",
                title
            ))),
            status if !status.is_success() => Err(ToolError::ExternalService(format!(
                "Wikipedia summary error: {}",
                status
            ))),
            _ => Ok(response.json().await?),
        }
    }
}

impl Default for WikipediaTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Leading `n` sentences of `text`.
fn first_sentences(text: &str, n: usize) -> &str {
    if n == 0 {
        return text;
    }
    let mut count = 0;
    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') && text[i + 1..].starts_with(' ') {
            count += 1;
            if count == n {
                return &text[..=i];
            }
        }
    }
    text
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Look up encyclopedic facts, definitions and biographies on Wikipedia."
    }

    fn is_relevant(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        let asks = mentions_any(&query, QUESTION_WORDS) || mentions_any(&query, WIKI_KEYWORDS);
        asks && !mentions_any(&query, AVOID_KEYWORDS)
    }

    async fn execute(&self, query: &str) -> Result<ToolOutput, ToolError> {
        let terms = Self::search_terms(query);
        if terms.is_empty() {
            return Err(ToolError::InvalidQuery("Empty Wikipedia query".into()));
        }

        debug!(terms = %terms, "Searching Wikipedia");
        let titles = self.search(terms).await?;
        let Some(title) = titles.first() else {
            return Ok(
                ToolOutput::new(format!("No Wikipedia articles found for '{}'", terms))
                    .with_confidence(0.1),
            );
        };

        debug!(title = %title, "Fetching Wikipedia summary");
        let page = self.summary(title).await?;
        let url = page
            .content_urls
            .map(|urls| urls.desktop.page)
            .unwrap_or_else(|| format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_")));

        if page.extract.trim().is_empty() {
            return Ok(
                ToolOutput::new(format!("Could not retrieve Wikipedia content for '{}'", title))
                    .with_confidence(0.2)
                    .with_source(url),
            );
        }

        let content = format!(
            "Wikipedia information for '{}':\n\n{}",
            page.title,
            first_sentences(page.extract.trim(), self.sentences)
        );

        Ok(ToolOutput::new(content).with_confidence(0.85).with_source(url))
    }
}
