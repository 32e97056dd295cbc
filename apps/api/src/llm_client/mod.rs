//! LLM client: the single point of entry for all chat-completion calls.
//!
//! No other module talks to the provider directly. The screening pipeline only
//! sees the `ChatModel` trait, so tests can swap in a scripted model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod normalize;
#[cfg(test)]
pub mod scripted;

/// Groq's OpenAI-compatible chat completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Gave up after {retries} retries: {source}")]
    RetriesExhausted {
        retries: u32,
        source: Box<LlmError>,
    },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// A text-in/text-out completion model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends `prompt` as the system message and returns the raw reply text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Text of the first choice, if the model produced any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Connection settings for `LlmClient`.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub backoff: Duration,
}

/// HTTP client for an OpenAI-compatible chat completion API.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Makes a raw call to the API, returning the full response object.
    /// With `max_retries > 0`, transport errors, 429 and 5xx responses are
    /// retried with exponential backoff.
    pub async fn call(&self, system: &str) -> Result<ChatResponse, LlmError> {
        let request_body = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "system",
                content: system,
            }],
        };

        let max_retries = self.settings.max_retries;
        let mut attempt = 0;

        loop {
            let error = match self.send(&request_body).await {
                Ok(response) => return Ok(response),
                Err(Failure::Fatal(e)) => return Err(e),
                Err(Failure::Retryable(e)) => e,
            };

            if attempt >= max_retries {
                return Err(if max_retries == 0 {
                    error
                } else {
                    LlmError::RetriesExhausted {
                        retries: max_retries,
                        source: Box::new(error),
                    }
                });
            }

            attempt += 1;
            let delay = self.settings.backoff * (1u32 << (attempt - 1).min(6));
            warn!(
                "LLM call attempt {} failed ({}), retrying after {}ms...",
                attempt,
                error,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send(&self, request_body: &ChatRequest<'_>) -> Result<ChatResponse, Failure> {
        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .json(request_body)
            .send()
            .await
            .map_err(|e| Failure::Retryable(LlmError::Http(e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = LlmError::Api {
                status: status.as_u16(),
                message: provider_message(body),
            };
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                warn!("LLM API returned {status}: {error}");
                Failure::Retryable(error)
            } else {
                Failure::Fatal(error)
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Failure::Fatal(LlmError::Http(e)))?;

        if let Some(usage) = &chat_response.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(chat_response)
    }
}

/// Outcome of one failed request.
enum Failure {
    Retryable(LlmError),
    Fatal(LlmError),
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.call(prompt).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Pulls `error.message` out of a provider error body, else returns the body as-is.
fn provider_message(body: String) -> String {
    serde_json::from_str::<ProviderError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    use super::*;

    const PATH: &str = "/openai/v1/chat/completions";

    fn client(server: &ServerGuard, max_retries: u32) -> LlmClient {
        LlmClient::new(LlmSettings {
            api_url: format!("{}{PATH}", server.url()),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
            max_retries,
            backoff: Duration::from_millis(10),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "test-model",
                "messages": [{"role": "system", "content": "Classify this"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "Senior-level"}}]}"#)
            .create_async()
            .await;

        let reply = client(&server, 0).complete("Classify this").await.unwrap();
        assert_eq!(reply, "Senior-level");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_choices_is_empty_content() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = client(&server, 0).complete("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent), "got {err:?}");
    }

    #[tokio::test]
    async fn test_server_error_not_retried_by_default() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(503)
            .with_body("overloaded")
            .expect(1)
            .create_async()
            .await;

        let err = client(&server, 0).call("prompt").await.unwrap_err();
        assert!(
            matches!(&err, LlmError::Api { status: 503, message } if message == "overloaded"),
            "got {err:?}"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_retried_until_exhausted() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(429)
            .with_body(r#"{"error": {"message": "Rate limit reached"}}"#)
            .expect(3)
            .create_async()
            .await;

        let err = client(&server, 2).call("prompt").await.unwrap_err();
        match &err {
            LlmError::RetriesExhausted { retries, source } => {
                assert_eq!(*retries, 2);
                assert!(matches!(source.as_ref(), LlmError::Api { status: 429, .. }));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert!(err.to_string().contains("Rate limit reached"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_surfaces_provider_message_without_retry() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(401)
            .with_body(r#"{"error": {"message": "Invalid API Key", "type": "invalid_request_error"}}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client(&server, 3).call("prompt").await.unwrap_err();
        assert!(
            matches!(&err, LlmError::Api { status: 401, message } if message == "Invalid API Key"),
            "got {err:?}"
        );
        mock.assert_async().await;
    }

    #[test]
    fn test_response_text_reads_first_choice() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Mid-level"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 3, "total_tokens": 123}
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text(), Some("Mid-level"));
        assert_eq!(response.usage.unwrap().completion_tokens, 3);
    }

    #[test]
    fn test_response_without_choices_has_no_text() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(response.text(), None);
    }

    #[test]
    fn test_provider_message_extracted() {
        let body = r#"{"error": {"message": "Invalid API Key", "type": "invalid_request_error"}}"#;
        assert_eq!(provider_message(body.to_string()), "Invalid API Key");
    }

    #[test]
    fn test_provider_message_falls_back_to_body() {
        assert_eq!(provider_message("upstream down".to_string()), "upstream down");
    }
}
