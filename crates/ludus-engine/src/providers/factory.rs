//! Provider selection from configuration and environment
//!
//! Flags win over environment variables; environment variables cover the
//! common case of a credential exported once per shell.

use crate::error::{EngineError, Result};
use crate::providers::{AnthropicProvider, OpenAiCompatibleProvider, Provider};

/// Provider selection inputs as collected from flags.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

/// Build a provider adapter from config and environment.
pub fn build_provider(config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    match normalize_provider_name(&config.provider).as_str() {
        "anthropic" => {
            let key = first_non_empty(&[&config.api_key, &env_var("ANTHROPIC_API_KEY")]);
            let key = key.ok_or_else(|| EngineError::MissingCredentials {
                provider: "anthropic".to_string(),
                hint: "set ANTHROPIC_API_KEY".to_string(),
            })?;
            Ok(Box::new(AnthropicProvider::new(
                key,
                config.model.clone(),
                config.base_url.clone(),
            )))
        }
        "openai-compatible" => {
            let key = first_non_empty(&[
                &config.api_key,
                &env_var("OPENAI_API_KEY"),
                &env_var("OPENAI_COMPATIBLE_API_KEY"),
                &env_var("API_KEY"),
            ]);
            let key = key.ok_or_else(|| EngineError::MissingCredentials {
                provider: "openai-compatible".to_string(),
                hint: "set OPENAI_API_KEY or equivalent".to_string(),
            })?;
            Ok(Box::new(OpenAiCompatibleProvider::new(
                key,
                config.model.clone(),
                config.base_url.clone(),
            )))
        }
        other => Err(EngineError::UnsupportedProvider(other.to_string())),
    }
}

/// Collapse vendor aliases onto the two supported provider names. An empty
/// name selects anthropic.
pub fn normalize_provider_name(raw: &str) -> String {
    let name = raw.trim().to_lowercase();
    match name.as_str() {
        "" => "anthropic".to_string(),
        "openai" | "openai_compatible" | "openrouter" | "litellm" => {
            "openai-compatible".to_string()
        }
        _ => name,
    }
}

fn env_var(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

fn first_non_empty(values: &[&str]) -> Option<String> {
    values
        .iter()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(|v| v.to_string())
}
