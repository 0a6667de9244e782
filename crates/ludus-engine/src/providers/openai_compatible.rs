//! OpenAI-compatible chat-completions client
//!
//! Speaks `POST {base_url}/chat/completions` with a Bearer token, which also
//! covers OpenRouter, LiteLLM, and any other endpoint mimicking the OpenAI
//! wire format.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::providers::{body_tail, Completion, CompletionRequest, Provider, ProviderInfo};

const PROVIDER_NAME: &str = "openai-compatible";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_BODY_TAIL_CHARS: usize = 240;

/// Client for any endpoint implementing the OpenAI chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    api_key: String,
    model: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
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
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user.clone(),
        });

        let body = ChatCompletionRequest {
            model: if request.model.trim().is_empty() {
                self.model.clone()
            } else {
                request.model.clone()
            },
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let start = Instant::now();
        let response = self
            .http_client
            .post(self.endpoint())
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Bearer {}", self.api_key))
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

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&raw).map_err(|err| EngineError::ProviderResponse {
                provider: PROVIDER_NAME.to_string(),
                detail: err.to_string(),
            })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| EngineError::ProviderResponse {
                provider: PROVIDER_NAME.to_string(),
                detail: "response missing choices".to_string(),
            })?;

        let usage = parsed.usage.unwrap_or(Usage {
            prompt_tokens: 0,
            completion_tokens: 0,
        });

        tracing::debug!(
            tokens_in = usage.prompt_tokens,
            tokens_out = usage.completion_tokens,
            duration_ms,
            "openai-compatible completion"
        );

        Ok(Completion {
            text,
            tokens_input: usage.prompt_tokens,
            tokens_output: usage.completion_tokens,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_for_empty_config() {
        let client = OpenAiCompatibleProvider::new("key", "", "");
        let info = client.info();
        assert_eq!(info.model, "gpt-4o-mini");
        assert_eq!(info.base_url, "https://api.openai.com/v1");
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_trailing_slash_trimmed_from_base_url() {
        let client = OpenAiCompatibleProvider::new("key", "gpt-4o-mini", "http://localhost:8080/v1/");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatCompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: "You are helpful.".into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: "hello".into(),
                },
            ],
            temperature: 1.0,
            max_tokens: 4096,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["max_tokens"], 4096);
    }

    #[test]
    fn test_response_parsing_tolerates_missing_usage() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content, "hi");
        assert!(parsed.usage.is_none());
    }
}
