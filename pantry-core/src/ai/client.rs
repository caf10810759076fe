//! AI client trait and the Anthropic Messages API implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::{AiConfig, ConfigError};
use super::types::{ChatMessage, ChatRequest, ChatResponse, Usage};

/// AI adapter failure.
///
/// `Display` is deliberately generic: upstream detail is carried in the
/// variant fields for logs and `Debug` only.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("AI service unavailable")]
    Unavailable { detail: String },

    #[error("Failed to parse AI response")]
    Unparseable { reason: String },

    #[error("AI response contained no recipe")]
    EmptyResult,

    #[error("AI extraction is not configured")]
    NotConfigured(#[from] ConfigError),
}

impl AiError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AiError::Unavailable { .. } => {
                "The recipe service is temporarily unavailable. Please try again in a few minutes."
            }
            AiError::Unparseable { .. } => {
                "We couldn't read a recipe from that content. Try a clearer image or add it manually."
            }
            AiError::EmptyResult => {
                "No ingredients or instructions were found. Try a different file or add the recipe manually."
            }
            AiError::NotConfigured(_) => {
                "Recipe import is not set up on this server. Please contact the administrator."
            }
        }
    }

    pub fn status_hint(&self) -> u16 {
        match self {
            AiError::Unavailable { .. } => 502,
            AiError::Unparseable { .. } | AiError::EmptyResult => 422,
            AiError::NotConfigured(_) => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AiError::Unavailable { .. })
    }
}

/// Trait for AI clients.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Complete a request. `task` names the prompt for logging.
    async fn complete(&self, task: &str, request: ChatRequest) -> Result<ChatResponse, AiError>;
}

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    config: AiConfig,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(config: AiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AiError::Unavailable {
                detail: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }

    /// Create a new client from environment configuration.
    pub fn from_env() -> Result<Self, AiError> {
        Self::new(AiConfig::from_env()?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }
}

/// Messages API request format.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Messages API response format.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseContent>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Error response from the Messages API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[async_trait]
impl AiClient for AnthropicClient {
    async fn complete(&self, task: &str, request: ChatRequest) -> Result<ChatResponse, AiError> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            system: request.system.as_deref(),
            messages: &request.messages,
            temperature: request.temperature,
        };

        tracing::debug!(task, model = %self.config.model, "calling AI API");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let detail = if e.is_timeout() {
                    format!("request timed out after {:?}", self.config.timeout)
                } else {
                    format!("connection failed: {e}")
                };
                tracing::warn!(task, %detail, "AI request failed");
                AiError::Unavailable { detail }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string());
            tracing::warn!(task, ?retry_after, "AI API rate limited");
            return Err(AiError::Unavailable {
                detail: format!("rate limited (retry-after: {retry_after:?})"),
            });
        }

        let text = response.text().await.map_err(|e| AiError::Unavailable {
            detail: format!("failed to read response body: {e}"),
        })?;

        if status != 200 {
            let message = serde_json::from_str::<ApiErrorResponse>(&text)
                .map(|r| r.error.message)
                .unwrap_or(text);
            tracing::warn!(task, status, %message, "AI API returned an error");
            return Err(AiError::Unavailable {
                detail: format!("HTTP {status}: {message}"),
            });
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&text).map_err(|e| AiError::Unavailable {
                detail: format!("malformed API envelope: {e}"),
            })?;

        let content = parsed
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        if content.trim().is_empty() {
            return Err(AiError::Unparseable {
                reason: "no text content in response".to_string(),
            });
        }

        tracing::debug!(
            task,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "AI call complete"
        );

        Ok(ChatResponse {
            content,
            usage: parsed.usage,
        })
    }
}
