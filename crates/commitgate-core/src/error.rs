//! Error taxonomy for change-set retrieval, parsing and configuration.

use serde::{Deserialize, Serialize};

/// commitgate errors.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("no change-set view available for {location} at revision {revision}")]
    FetchUnavailable { location: String, revision: String },

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("`{command}` failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("`{command}` timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    #[error("failed to parse change log: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("evaluation panicked: {0}")]
    Panicked(String),
}

impl GateError {
    /// Coarse classification reported alongside a fail-open verdict.
    pub fn failure_code(&self) -> FailureCode {
        match self {
            GateError::FetchUnavailable { .. } => FailureCode::FetchUnavailable,
            GateError::Parse(_) => FailureCode::ParseFailed,
            GateError::Fetch(_)
            | GateError::Git { .. }
            | GateError::Timeout { .. }
            | GateError::Io(_) => FailureCode::FetchFailed,
            GateError::Config(_) | GateError::Serialization(_) | GateError::Panicked(_) => {
                FailureCode::Internal
            }
        }
    }
}

/// Distinguishable reason a decision fell back to "build anyway".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    /// The source could not produce a view of the current revision.
    FetchUnavailable,
    /// Reading the change log failed (git error, timeout, I/O).
    FetchFailed,
    /// The change log could not be decoded.
    ParseFailed,
    /// Anything else, including a panic in a fetcher.
    Internal,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCode::FetchUnavailable => "fetch_unavailable",
            FailureCode::FetchFailed => "fetch_failed",
            FailureCode::ParseFailed => "parse_failed",
            FailureCode::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type for commitgate operations.
pub type Result<T> = std::result::Result<T, GateError>;
