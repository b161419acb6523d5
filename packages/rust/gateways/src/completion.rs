//! AI completion gateway: OpenAI-compatible chat completions over HTTP.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use lessonforge_shared::{LessonForgeError, Result};

use crate::retry::{RetryPolicy, with_retry};

/// Hosted completion endpoint base.
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// User-Agent string for gateway requests.
const USER_AGENT: &str = concat!("LessonForge/", env!("CARGO_PKG_VERSION"));

/// Sends a system+user prompt pair to a hosted completion model and returns
/// the raw response text.
#[allow(async_fn_in_trait)]
pub trait CompletionGateway {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

// ---------------------------------------------------------------------------
// OpenRouter client
// ---------------------------------------------------------------------------

/// Completion gateway backed by the OpenRouter chat-completions API.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenRouterClient {
    /// Create a client. An empty API key is a configuration error — callers
    /// learn about missing credentials before any job work starts.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, retry: RetryPolicy) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LessonForgeError::config(
                "OpenRouter API key is empty; completion gateway cannot be constructed",
            ));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| {
                LessonForgeError::Completion(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url: OPENROUTER_BASE_URL.to_string(),
            retry,
        })
    }

    /// Override the endpoint base URL (integration tests with mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn complete_once(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LessonForgeError::Completion(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LessonForgeError::Completion(format!(
                "HTTP {status}: {}",
                crate::truncate_body(&body)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LessonForgeError::Completion(format!("invalid response body: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                LessonForgeError::Completion("response contained no choices".into())
            })?;

        debug!(model = %self.model, max_tokens, response_len = text.len(), "completion ok");
        Ok(text)
    }
}

impl CompletionGateway for OpenRouterClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String> {
        with_retry(&self.retry, "completion", || {
            self.complete_once(system_prompt, user_prompt, max_tokens)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn empty_key_fails_construction() {
        let result = OpenRouterClient::new("", "test-model", RetryPolicy::none());
        assert!(matches!(
            result,
            Err(LessonForgeError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn complete_returns_choice_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "max_tokens": 1024,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("[\"a\"]")))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new("test-key", "test-model", RetryPolicy::none())
            .unwrap()
            .with_base_url(server.uri());

        let text = client.complete("system", "user", 1024).await.unwrap();
        assert_eq!(text, "[\"a\"]");
    }

    #[tokio::test]
    async fn non_success_status_is_completion_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new("test-key", "test-model", RetryPolicy::none())
            .unwrap()
            .with_base_url(server.uri());

        let err = client.complete("s", "u", 256).await.unwrap_err();
        match err {
            LessonForgeError::Completion(msg) => {
                assert!(msg.contains("429"), "got: {msg}");
            }
            other => panic!("expected Completion error, got {other}"),
        }
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("recovered")))
            .with_priority(2)
            .mount(&server)
            .await;

        let retry = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        };
        let client = OpenRouterClient::new("test-key", "test-model", retry)
            .unwrap()
            .with_base_url(server.uri());

        let text = client.complete("s", "u", 256).await.unwrap();
        assert_eq!(text, "recovered");
    }

    #[tokio::test]
    async fn empty_choices_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = OpenRouterClient::new("test-key", "test-model", RetryPolicy::none())
            .unwrap()
            .with_base_url(server.uri());

        let err = client.complete("s", "u", 256).await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
