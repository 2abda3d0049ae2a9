// Completion provider implementation using OpenAI
//
// This is the infrastructure implementation of BaseCompletionProvider.
// Prompt construction lives in the summarization domain.

use std::time::Duration;

use async_trait::async_trait;
use openai_client::{ChatRequest, OpenAIClient, OpenAIError};

use super::traits::{BaseCompletionProvider, Message, ProviderError};

/// OpenAI implementation of the completion provider
#[derive(Clone)]
pub struct OpenAIProvider {
    client: OpenAIClient,
    model: String,
    temperature: f32,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: OpenAIClient::new(api_key),
            model: model.into(),
            temperature: 0.7,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.with_timeout(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl From<OpenAIError> for ProviderError {
    fn from(e: OpenAIError) -> Self {
        match e {
            OpenAIError::Authentication { message } => ProviderError::Authentication(message),
            OpenAIError::RateLimited {
                message,
                retry_after,
            } => ProviderError::RateLimited {
                message,
                retry_after,
            },
            OpenAIError::Server { status, message } => ProviderError::Server { status, message },
            OpenAIError::Client { status, message } => ProviderError::Client { status, message },
            OpenAIError::Timeout(msg) | OpenAIError::Network(msg) => ProviderError::Transport(msg),
            OpenAIError::Config(msg) | OpenAIError::Parse(msg) => ProviderError::Unexpected(msg),
        }
    }
}

#[async_trait]
impl BaseCompletionProvider for OpenAIProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        tracing::info!(model = %self.model, max_tokens, "Calling OpenAI API");

        let request = ChatRequest::new(self.model.clone())
            .messages(messages)
            .temperature(self.temperature)
            .token_budget(max_tokens);

        let response = self.client.chat_completion(request).await?;

        tracing::info!(
            response_length = response.content.len(),
            model = %self.model,
            "OpenAI API response received"
        );

        Ok(response.content.trim().to_string())
    }
}
