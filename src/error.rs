//! Error handling for the demo engine
//!
//! Provides the domain error type using thiserror. Navigation dead ends
//! (nothing next, unknown id, …) are *not* errors; they are reported through
//! [`crate::runner::NavOutcome`]. Only conditions that stop a request from
//! completing end up here.

use thiserror::Error;

/// Main error type for the demo engine
#[derive(Error, Debug)]
pub enum DemoTimeError {
    /// IO errors (state file, demo folder, …)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML demo file errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistence collaborator failures
    #[error("State store error: {0}")]
    Store(String),

    /// A snippet referenced by an active step could not be read
    #[error("Snippet not found: {path}")]
    SnippetUnavailable { path: String },

    /// A snippet was read but did not produce a step list
    #[error("Snippet {path} is not a valid step list: {reason}")]
    SnippetInvalid { path: String, reason: String },

    /// Substituted steps no longer deserialize
    #[error("Step rewrite failed: {0}")]
    Substitution(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, DemoTimeError>;

impl DemoTimeError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a substitution error
    pub fn substitution(msg: impl Into<String>) -> Self {
        Self::Substitution(msg.into())
    }

    /// True for the failures that abort a dispatch in progress
    pub fn is_snippet_failure(&self) -> bool {
        matches!(
            self,
            Self::SnippetUnavailable { .. } | Self::SnippetInvalid { .. }
        )
    }
}

impl From<anyhow::Error> for DemoTimeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(format!("{:#}", err))
    }
}
