//! Error types for the core state model
//!
//! We use `thiserror` for ergonomic error definitions with automatic
//! Display/Error implementations. Several display strings are part of the
//! user-facing contract and are asserted verbatim by the test suite.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Main error type for state document operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("session \"{0}\" not found")]
    SessionNotFound(String),

    /// Raised by artifact listing, which reports the session by id without
    /// quoting it.
    #[error("session not found: {0}")]
    SessionMissing(String),

    #[error("lineage \"{0}\" not found")]
    LineageNotFound(String),

    #[error("agent \"{0}\" not found")]
    AgentNotFound(String),

    #[error("artifact \"{0}\" not found")]
    ArtifactNotFound(String),

    #[error("directive \"{0}\" not found")]
    DirectiveNotFound(String),

    /// A global lookup matched the same id in more than one place.
    #[error("{kind} {id} not unique")]
    NotUnique { kind: &'static str, id: String },

    #[error("score must be between 1-10")]
    ScoreOutOfRange,

    #[error("artifact already evaluated")]
    AlreadyEvaluated,

    /// The document declares a schema version newer than this binary supports.
    #[error("unsupported state version \"{0}\"")]
    UnsupportedVersion(String),

    #[error("read state file \"{path}\": {source}")]
    ReadState {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("write state file \"{path}\": {source}")]
    WriteState {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("decode state file \"{path}\": {source}")]
    DecodeState {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unsupported export format \"{0}\"")]
    UnsupportedFormat(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Shorthand for input-validation failures with literal messages.
    pub fn invalid(message: impl Into<String>) -> Self {
        CoreError::InvalidInput(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_error_strings() {
        assert_eq!(
            CoreError::ScoreOutOfRange.to_string(),
            "score must be between 1-10"
        );
        assert_eq!(
            CoreError::AlreadyEvaluated.to_string(),
            "artifact already evaluated"
        );
        assert_eq!(
            CoreError::LineageNotFound("E".into()).to_string(),
            "lineage \"E\" not found"
        );
        assert_eq!(
            CoreError::NotUnique {
                kind: "artifact",
                id: "art_collision".into()
            }
            .to_string(),
            "artifact art_collision not unique"
        );
    }

    #[test]
    fn test_session_errors_distinguish_listing_form() {
        assert_eq!(
            CoreError::SessionNotFound("ses_0a1b2c3d".into()).to_string(),
            "session \"ses_0a1b2c3d\" not found"
        );
        assert_eq!(
            CoreError::SessionMissing("ses_0a1b2c3d".into()).to_string(),
            "session not found: ses_0a1b2c3d"
        );
    }
}
