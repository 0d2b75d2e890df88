use thiserror::Error;

use crate::actors::messages::ActorError;

/// Crate-wide error type. Each variant is one class of failure the pipeline
/// knows how to resolve.
#[derive(Debug, Error, Clone)]
pub enum AppError {
    /// Missing credentials or an invalid pattern table / catalog. Fatal at
    /// startup, never raised per turn.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or service failure while talking to an external model.
    #[error("Actor error: {0}")]
    Actor(#[from] ActorError),

    /// An external model call did not complete within its budget.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Model output that is not parseable or does not match the expected schema.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// Rejected input at a boundary (unknown classification label, bad turn request).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unexpected internal errors that indicate a bug.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the failure came from a slow or unreachable dependency rather
    /// than from what it returned.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Actor(_) | AppError::Timeout(_))
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Operation timed out: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(format!("JSON error: {}", err))
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Config(format!("URL parse error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation errors: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(format!("HTTP timeout: {}", err))
        } else if err.is_decode() {
            AppError::MalformedResponse(format!("HTTP body decode error: {}", err))
        } else {
            AppError::Actor(ActorError::Transport(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AppError::Timeout("slow".to_string()).is_transient());
        assert!(AppError::Actor(ActorError::Unavailable("closed".to_string())).is_transient());
        assert!(!AppError::MalformedResponse("not json".to_string()).is_transient());
        assert!(!AppError::Config("missing key".to_string()).is_transient());
    }

    #[test]
    fn test_json_error_is_malformed_response() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let app: AppError = err.into();
        assert!(matches!(app, AppError::MalformedResponse(_)));
    }
}
