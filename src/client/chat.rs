//! OpenAI-compatible chat-completion client.
//!
//! One call to [`CompletionClient::complete`] is one HTTP attempt. Retrying
//! is layered on top by [`query`], so the driver sees a single
//! [`QueryOutcome`] per repetition.

use crate::client::{QueryOutcome, RetryPolicy, retry};
use crate::models::{ApiError, Config, ModelSpec, ProbeError, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request payload.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f64,
}

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// API error response body.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Something that can answer a single prompt with a single attempt.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` once and return the model's trimmed text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Query `client` with bounded retry, folding exhaustion into the outcome.
pub async fn query<C>(client: &C, prompt: &str, policy: &RetryPolicy) -> QueryOutcome
where
    C: CompletionClient + ?Sized,
{
    retry(policy, |attempt| {
        debug!(attempt = attempt + 1, "Querying model");
        client.complete(prompt)
    })
    .await
    .into()
}

/// Chat-completion API client.
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
    model: ModelSpec,
}

impl ChatClient {
    /// Create a new client for one model.
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        model: ModelSpec,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProbeError::Network)?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            model,
        })
    }

    /// Build a client from the `[api]` and `[model]` sections.
    pub fn from_config(config: &Config, api_key: String) -> Result<Self> {
        Self::new(
            api_key,
            config.api.base_url.clone(),
            config.model.clone(),
            config.api.timeout(),
        )
    }

    /// Build headers for a request.
    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| ProbeError::Internal("API key is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl CompletionClient for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let request = ChatCompletionRequest {
            model: &self.model.id,
            messages: vec![Message::user(prompt)],
            max_tokens: self.model.max_tokens,
            temperature: self.model.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Timeout(self.timeout)
                } else {
                    ProbeError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            if code == 401 {
                return Err(ApiError::AuthenticationFailed.into());
            }
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or(body);
            return Err(ApiError::Status {
                status: code,
                message,
            }
            .into());
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProbeError::Parse(format!("Failed to parse response: {e}")))?;

        let choice = body.choices.into_iter().next().ok_or(ApiError::EmptyChoices)?;
        let content = choice
            .message
            .content
            .ok_or_else(|| ApiError::InvalidResponse("message has no content".into()))?;

        debug!(
            model = %self.model.id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Completion received"
        );

        Ok(content.trim().to_string())
    }
}
