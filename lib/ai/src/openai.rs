//! OpenAI-compatible chat completions backend.
//!
//! Works against any endpoint that speaks `POST {base_url}/chat/completions`
//! with bearer authentication, including Groq, OpenAI, and local proxies.

use crate::backend::{CompletionBackend, CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Groq's OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Configuration for an OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Bearer credential.
    pub api_key: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl BackendConfig {
    /// Creates a configuration for the default Groq endpoint.
    #[must_use]
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Overrides the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Chat completion backend for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    client: Client,
    completions_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl OpenAiCompatibleBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] if the credential is blank or the
    /// HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "API key is empty".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            completions_url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    /// The full URL requests are posted to.
    #[must_use]
    pub fn completions_url(&self) -> &str {
        &self.completions_url
    }
}

fn transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::RequestFailed {
            reason: e.to_string(),
        }
    }
}

fn retry_after_secs(headers: &header::HeaderMap) -> Option<u64> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn truncate(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        let cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{cut}...")
    } else {
        body.to_string()
    }
}

fn parse_response(body: &str, requested_model: &str) -> Result<CompletionResponse, LlmError> {
    let parsed: ApiChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::ResponseParseFailed {
            reason: e.to_string(),
        })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::ResponseParseFailed {
            reason: "response contained no choices".to_string(),
        })?
        .message
        .content
        .ok_or_else(|| LlmError::ResponseParseFailed {
            reason: "top choice has no content".to_string(),
        })?;

    if content.trim().is_empty() {
        return Err(LlmError::ResponseParseFailed {
            reason: "top choice has empty content".to_string(),
        });
    }

    let usage = parsed
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content,
        model: parsed.model.unwrap_or_else(|| requested_model.to_string()),
        usage,
    })
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleBackend {
    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let response = self
            .client
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(LlmError::Unauthorized {
                    status: status.as_u16(),
                });
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(LlmError::RateLimited {
                    retry_after_secs: retry_after_secs(response.headers()),
                });
            }
            _ => {}
        }

        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            debug!(status = %status, "completion endpoint returned error status");
            return Err(LlmError::UpstreamStatus {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let reply = parse_response(&body, &request.model)?;
        debug!(
            input_tokens = reply.usage.input_tokens,
            output_tokens = reply.usage.output_tokens,
            "completion received"
        );
        Ok(reply)
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}
