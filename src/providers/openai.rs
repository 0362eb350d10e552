//! OpenAI chat-completions provider for VoxChat
//!
//! Talks to `/chat/completions` on the OpenAI API or any compatible server.
//! HTTP 429 responses (quota exhaustion or request rate limits) are reported
//! as [`VoxchatError::RateLimited`] with the backoff from the `Retry-After`
//! header when the server sends one.

use crate::config::OpenAiConfig;
use crate::error::{Result, VoxchatError};
use crate::providers::{CompletionOptions, CompletionResponse, Message, Provider, TokenUsage};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI chat-completions provider
///
/// # Examples
///
/// ```
/// use voxchat::config::OpenAiConfig;
/// use voxchat::providers::{OpenAiProvider, Provider};
///
/// let config = OpenAiConfig {
///     api_key: Some("sk-test".to_string()),
///     ..Default::default()
/// };
/// let provider = OpenAiProvider::new(config).unwrap();
/// assert_eq!(provider.model(), "gpt-4o-mini");
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    api_key: String,
}

/// Request structure for the chat-completions API
#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

/// Response structure from the chat-completions API
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

/// Error envelope returned by the API
#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider instance
    ///
    /// # Errors
    ///
    /// Returns error if no API key is configured or the HTTP client cannot
    /// be built
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| VoxchatError::MissingCredentials("openai".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("voxchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VoxchatError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// Build the error for a non-success response
    fn api_error(&self, status: StatusCode, headers: &HeaderMap, body: &str) -> VoxchatError {
        let parsed = serde_json::from_str::<OpenAiErrorEnvelope>(body).ok();
        let message = parsed
            .as_ref()
            .map(|e| e.error.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.to_string());

        if status == StatusCode::TOO_MANY_REQUESTS {
            let code = parsed
                .and_then(|e| e.error.code)
                .unwrap_or_else(|| "rate_limit_exceeded".to_string());
            let retry_after_secs =
                retry_after_secs(headers).unwrap_or(self.config.rate_limit_retry_secs);
            tracing::warn!(
                code = %code,
                retry_after_secs,
                "OpenAI signalled rate limiting"
            );
            return VoxchatError::RateLimited {
                retry_after_secs,
                message: format!("{}: {}", code, message),
            };
        }

        tracing::error!("OpenAI returned error {}: {}", status, message);
        VoxchatError::Provider(format!("OpenAI returned error {}: {}", status, message))
    }
}

/// Parse a `Retry-After` header given in whole seconds
fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.ceil() as u64)
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse> {
        let model = options.model.as_deref().unwrap_or(&self.config.model);
        let request = OpenAiRequest {
            model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        tracing::debug!(
            "Sending OpenAI request: {} messages, model={}",
            messages.len(),
            model
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("OpenAI request failed: {}", e);
                VoxchatError::Provider(format!("OpenAI request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.api_error(status, &headers, &error_text).into());
        }

        let parsed: OpenAiResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse OpenAI response: {}", e);
            VoxchatError::Provider(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| VoxchatError::Provider("No choices in OpenAI response".to_string()))?;

        let message = Message::assistant(choice.message.content.unwrap_or_default());
        let response = match parsed.usage {
            Some(u) => {
                let usage = TokenUsage::new(u.prompt_tokens, u.completion_tokens);
                tracing::debug!(total_tokens = usage.total_tokens, "OpenAI response received");
                CompletionResponse::with_usage(message, usage)
            }
            None => CompletionResponse::new(message),
        };

        Ok(response)
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }
}
