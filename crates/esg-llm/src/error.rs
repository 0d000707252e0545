//! Error types for LLM operations

use std::time::Duration;
use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// The model answered with no text
    #[error("Empty response from {0}")]
    EmptyResponse(String),

    /// A call exceeded its upper time bound
    #[error("{operation} timed out after {secs}s", secs = .elapsed.as_secs())]
    Timeout {
        operation: String,
        elapsed: Duration,
    },

    /// Provider-specific error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LLMError {
    /// Whether the error is a timeout or a dropped connection
    pub fn is_timeout_or_disconnect(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::HttpError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = LLMError::Timeout {
            operation: "deep_research".to_string(),
            elapsed: Duration::from_secs(1800),
        };
        assert_eq!(err.to_string(), "deep_research timed out after 1800s");
        assert!(err.is_timeout_or_disconnect());
    }

    #[test]
    fn test_non_timeout() {
        assert!(!LLMError::AuthenticationFailed.is_timeout_or_disconnect());
        assert!(!LLMError::EmptyResponse("qwen".to_string()).is_timeout_or_disconnect());
    }
}
