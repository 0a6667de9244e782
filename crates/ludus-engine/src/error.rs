//! Error types for the lifecycle engine
//!
//! Core state errors pass through transparently so their contract strings
//! survive to the CLI boundary unchanged.

use thiserror::Error;

use ludus_core::CoreError;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for provider, executor, and orchestration failures
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Input-validation failures whose messages are user-facing contract.
    #[error("{0}")]
    InvalidInput(String),

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("missing {provider} credentials: {hint}")]
    MissingCredentials { provider: String, hint: String },

    #[error("{provider} API error ({status}): {detail}")]
    ProviderStatus {
        provider: String,
        status: u16,
        detail: String,
    },

    #[error("call {provider} API: {source}")]
    ProviderTransport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned an unusable response: {detail}")]
    ProviderResponse { provider: String, detail: String },

    #[error("executor must be one of: codex, claude")]
    UnsupportedExecutor,

    #[error("resolve executor \"{0}\": not found on PATH")]
    ExecutorNotFound(String),

    #[error("run executor \"{name}\": {detail}")]
    ExecutorFailed { name: String, detail: String },

    #[error("executor \"{name}\" timed out after {timeout_secs}s")]
    ExecutorTimeout { name: String, timeout_secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Shorthand for input-validation failures with literal messages.
    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidInput(message.into())
    }
}
