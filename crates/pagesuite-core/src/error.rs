//! Unified error types for pagesuite

use thiserror::Error;

/// Unified error type for all pagesuite operations
///
/// The first four variants are infrastructure errors: they make a test case
/// *error*. An ordinary failing suite is not an error at all, it is a
/// [`SuiteOutcome`](crate::SuiteOutcome) with `success == false`.
#[derive(Error, Debug)]
pub enum SuiteError {
    // Session errors
    #[error("Timed out after {waited_ms}ms waiting for {subject}")]
    Timeout { subject: String, waited_ms: u64 },

    #[error("Browser session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("Failed to load {url}: {reason}")]
    NavigationFailure { url: String, reason: String },

    #[error("Script evaluation failed: {0}")]
    Script(String),

    // Setup errors
    #[error("Invalid test target: {0}")]
    InvalidTarget(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl SuiteError {
    /// Stable category name used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            SuiteError::Timeout { .. } => "timeout",
            SuiteError::SessionUnavailable(_) => "session-unavailable",
            SuiteError::NavigationFailure { .. } => "navigation-failure",
            SuiteError::Script(_) => "script",
            SuiteError::InvalidTarget(_) => "invalid-target",
            SuiteError::Config(_) => "config",
            SuiteError::Io(_) => "io",
            SuiteError::Serialization(_) => "serialization",
            SuiteError::Other(_) => "other",
        }
    }

    /// Whether the shared session is gone and the rest of the run cannot proceed
    pub fn is_fatal(&self) -> bool {
        matches!(self, SuiteError::SessionUnavailable(_))
    }
}

/// Result type alias using SuiteError
pub type Result<T> = std::result::Result<T, SuiteError>;
