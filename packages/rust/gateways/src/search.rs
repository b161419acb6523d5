//! Web search gateway: Tavily-style search API over HTTP.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use lessonforge_shared::{LessonForgeError, Result};

use crate::retry::{RetryPolicy, with_retry};

/// Hosted search endpoint base.
const TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// User-Agent string for gateway requests.
const USER_AGENT: &str = concat!("LessonForge/", env!("CARGO_PKG_VERSION"));

/// Hard result cap enforced by the gateway; requests above it are clamped
/// client-side.
pub const SEARCH_RESULT_CAP: usize = 40;

/// Search depth requested from the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    Advanced,
}

/// Options for one search call.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub depth: SearchDepth,
    /// Requested result count; clamped to [`SEARCH_RESULT_CAP`].
    pub max_results: usize,
    /// Restrict results to these domains (empty = unrestricted).
    pub include_domains: Vec<String>,
    /// Ask the gateway for full extracted page text, not just snippets.
    pub include_raw_content: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            depth: SearchDepth::Advanced,
            max_results: 10,
            include_domains: Vec::new(),
            include_raw_content: true,
        }
    }
}

/// One ranked source record from the search gateway.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    /// Extracted page text (raw content when available, snippet otherwise).
    pub content: String,
    pub score: Option<f64>,
}

/// Sends a query plus filtering options, returns ranked source records.
#[allow(async_fn_in_trait)]
pub trait SearchGateway {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: SearchDepth,
    max_results: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    include_domains: Vec<String>,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    raw_content: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

// ---------------------------------------------------------------------------
// Tavily client
// ---------------------------------------------------------------------------

/// Search gateway backed by the Tavily search API.
pub struct TavilyClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl TavilyClient {
    /// Create a client. An empty API key is a configuration error.
    pub fn new(api_key: impl Into<String>, retry: RetryPolicy) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LessonForgeError::config(
                "Tavily API key is empty; search gateway cannot be constructed",
            ));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LessonForgeError::Search(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: TAVILY_BASE_URL.to_string(),
            retry,
        })
    }

    /// Override the endpoint base URL (integration tests with mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search_once(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let request = SearchRequest {
            query,
            search_depth: options.depth,
            max_results: options.max_results.min(SEARCH_RESULT_CAP),
            include_domains: options.include_domains.clone(),
            include_raw_content: options.include_raw_content,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LessonForgeError::Search(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LessonForgeError::Search(format!(
                "HTTP {status}: {}",
                crate::truncate_body(&body)
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| LessonForgeError::Search(format!("invalid response body: {e}")))?;

        let hits: Vec<SearchHit> = parsed
            .results
            .into_iter()
            .map(|r| {
                let content = r
                    .raw_content
                    .filter(|c| !c.is_empty())
                    .or(r.content)
                    .unwrap_or_default();
                SearchHit {
                    url: r.url,
                    title: r.title,
                    content,
                    score: r.score,
                }
            })
            .collect();

        debug!(query, hits = hits.len(), "search ok");
        Ok(hits)
    }
}

impl SearchGateway for TavilyClient {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        with_retry(&self.retry, "search", || self.search_once(query, options)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn results_body(results: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "results": results })
    }

    #[test]
    fn empty_key_fails_construction() {
        let result = TavilyClient::new("", RetryPolicy::none());
        assert!(matches!(result, Err(LessonForgeError::Config { .. })));
    }

    #[tokio::test]
    async fn search_prefers_raw_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(serde_json::json!({
                "query": "present perfect guide",
                "search_depth": "advanced",
                "include_raw_content": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(
                serde_json::json!([
                    {
                        "url": "https://en.wikipedia.org/wiki/Present_perfect",
                        "title": "Present perfect",
                        "content": "snippet",
                        "raw_content": "full extracted article text",
                        "score": 0.93,
                    },
                    {
                        "url": "https://example.com/thin",
                        "title": "Thin",
                        "content": "only a snippet",
                        "raw_content": null,
                    }
                ]),
            )))
            .mount(&server)
            .await;

        let client = TavilyClient::new("test-key", RetryPolicy::none())
            .unwrap()
            .with_base_url(server.uri());

        let hits = client
            .search("present perfect guide", &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "full extracted article text");
        assert_eq!(hits[0].score, Some(0.93));
        assert_eq!(hits[1].content, "only a snippet");
        assert!(hits[1].score.is_none());
    }

    #[tokio::test]
    async fn max_results_clamped_to_gateway_cap() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(serde_json::json!({"max_results": 40})))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(
                serde_json::json!([]),
            )))
            .mount(&server)
            .await;

        let client = TavilyClient::new("test-key", RetryPolicy::none())
            .unwrap()
            .with_base_url(server.uri());

        let options = SearchOptions {
            max_results: 100,
            ..Default::default()
        };
        // The mock only matches when the body carries the clamped value.
        let hits = client.search("anything", &options).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn domain_allowlist_is_forwarded() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(serde_json::json!({
                "include_domains": ["en.wikipedia.org", "cambridge.org"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(
                serde_json::json!([]),
            )))
            .mount(&server)
            .await;

        let client = TavilyClient::new("test-key", RetryPolicy::none())
            .unwrap()
            .with_base_url(server.uri());

        let options = SearchOptions {
            include_domains: vec!["en.wikipedia.org".into(), "cambridge.org".into()],
            ..Default::default()
        };
        assert!(client.search("q", &options).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_search_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = TavilyClient::new("test-key", RetryPolicy::none())
            .unwrap()
            .with_base_url(server.uri());

        let err = client
            .search("q", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LessonForgeError::Search(_)));
    }
}
