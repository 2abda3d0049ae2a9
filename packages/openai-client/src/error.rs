//! Error types for OpenAI client.

use std::time::Duration;

use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// OpenAI client errors.
///
/// Non-2xx responses are split by class so callers can pick a retry policy
/// without parsing message strings.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// 401 - credentials missing or rejected
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// 429 - too many requests
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Parsed `retry-after` header, when the provider sent one
        retry_after: Option<Duration>,
    },

    /// 5xx - provider-side failure
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// 4xx other than 401/429
    #[error("Client error ({status}): {message}")]
    Client { status: u16, message: String },

    /// Request exceeded the client timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Network error (connection failed, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl OpenAIError {
    /// HTTP status carried by the error, if it came from an API response.
    pub fn status(&self) -> Option<u16> {
        match self {
            OpenAIError::Authentication { .. } => Some(401),
            OpenAIError::RateLimited { .. } => Some(429),
            OpenAIError::Server { status, .. } | OpenAIError::Client { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OpenAIError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OpenAIError::Timeout(e.to_string())
        } else if e.is_decode() {
            OpenAIError::Parse(e.to_string())
        } else {
            OpenAIError::Network(e.to_string())
        }
    }
}
