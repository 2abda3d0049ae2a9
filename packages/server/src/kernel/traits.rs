// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// What to prompt for and how to react to failures lives in the summarization domain.
//
// Naming convention: Base* for trait names (e.g., BaseCompletionProvider)

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use openai_client::Message;

// =============================================================================
// Completion Provider Trait (Infrastructure - external text generation)
// =============================================================================

/// Failure classes a completion provider can report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Credentials invalid or missing
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Too many requests; `retry_after` is the provider's hint, if any
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// 5xx-equivalent
    #[error("provider error ({status}): {message}")]
    Server { status: u16, message: String },

    /// 4xx-equivalent other than authentication
    #[error("request rejected ({status}): {message}")]
    Client { status: u16, message: String },

    /// Connection failure or timeout
    #[error("transport error: {0}")]
    Transport(String),

    /// Anything else
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

#[async_trait]
pub trait BaseCompletionProvider: Send + Sync {
    /// Generate text for role-tagged messages within an output-token budget.
    async fn complete(
        &self,
        messages: Vec<Message>,
        max_tokens: u32,
    ) -> Result<String, ProviderError>;
}
