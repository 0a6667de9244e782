//! Chat-completion provider clients
//!
//! Both clients expose the same capability: send one (system?, user) pair to
//! a vendor endpoint and return the text plus usage signals. The engine never
//! sees a vendor type; it works against the [`Provider`] trait and lets the
//! factory pick the implementation from configuration.

mod anthropic;
mod factory;
mod openai_compatible;

pub use anthropic::AnthropicProvider;
pub use factory::{build_provider, normalize_provider_name, ProviderConfig};
pub use openai_compatible::OpenAiCompatibleProvider;

use async_trait::async_trait;

use crate::error::Result;

/// One chat-completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Optional system prompt; omitted from the wire when empty.
    pub system: Option<String>,
    pub user: String,
    /// Model override; the client's configured model applies when empty.
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// A request with the sampling defaults used for agent generation.
    pub fn generation(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            model: String::new(),
            temperature: 1.0,
            max_tokens: 4096,
        }
    }
}

/// One chat-completion result with usage signals.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub duration_ms: u64,
}

/// Identity of a configured provider instance.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub provider: String,
    pub model: String,
    pub base_url: String,
}

/// A chat-completion backend.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Send one completion request and measure wall time around it.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;

    /// Identity of this provider instance.
    fn info(&self) -> ProviderInfo;
}

/// The trailing portion of an error body, bounded for log and error display.
pub(crate) fn body_tail(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    let skipped = count - max_chars;
    let tail: String = trimmed.chars().skip(skipped).collect();
    format!("...{}", tail)
}
