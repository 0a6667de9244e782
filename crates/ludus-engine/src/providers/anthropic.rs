//! Anthropic Messages API client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::providers::{body_tail, Completion, CompletionRequest, Provider, ProviderInfo};

const PROVIDER_NAME: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_BODY_TAIL_CHARS: usize = 240;

/// Client for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let model = model.into();
        let base_url = base_url.into();
        Self {
            api_key: api_key.into(),
            model: if model.trim().is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model
            },
            base_url: if base_url.trim().is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                base_url.trim_end_matches('/').to_string()
            },
            http_client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let body = MessagesRequest {
            model: if request.model.trim().is_empty() {
                self.model.clone()
            } else {
                request.model.clone()
            },
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.clone().unwrap_or_default(),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.user.clone(),
            }],
        };

        let start = Instant::now();
        let response = self
            .http_client
            .post(self.endpoint())
            .timeout(REQUEST_TIMEOUT)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|source| EngineError::ProviderTransport {
                provider: PROVIDER_NAME.to_string(),
                source,
            })?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|source| EngineError::ProviderTransport {
                provider: PROVIDER_NAME.to_string(),
                source,
            })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        if !status.is_success() {
            return Err(EngineError::ProviderStatus {
                provider: PROVIDER_NAME.to_string(),
                status: status.as_u16(),
                detail: body_tail(&raw, ERROR_BODY_TAIL_CHARS),
            });
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&raw).map_err(|err| EngineError::ProviderResponse {
                provider: PROVIDER_NAME.to_string(),
                detail: err.to_string(),
            })?;

        let text = parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| EngineError::ProviderResponse {
                provider: PROVIDER_NAME.to_string(),
                detail: "response missing content".to_string(),
            })?;

        let usage = parsed.usage.unwrap_or(Usage {
            input_tokens: 0,
            output_tokens: 0,
        });

        tracing::debug!(
            tokens_in = usage.input_tokens,
            tokens_out = usage.output_tokens,
            duration_ms,
            "anthropic completion"
        );

        Ok(Completion {
            text,
            tokens_input: usage.input_tokens,
            tokens_output: usage.output_tokens,
            duration_ms,
        })
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: PROVIDER_NAME.to_string(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
        }
    }
}
