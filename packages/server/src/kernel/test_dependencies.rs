// TestDependencies - mock implementations for testing
//
// Provides a scripted completion provider that can be injected into workers for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{BaseCompletionProvider, Message, ProviderError};

// =============================================================================
// Mock Completion Provider
// =============================================================================

/// Arguments captured from a completion call
#[derive(Debug, Clone)]
pub struct CompletionCall {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

/// Replays scripted responses in order, then falls back to a default summary.
#[derive(Clone)]
pub struct MockCompletionProvider {
    responses: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    calls: Arc<Mutex<Vec<CompletionCall>>>,
    latency: Option<Duration>,
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompletionProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            latency: None,
        }
    }

    /// Add a successful response to the queue
    pub fn with_response(self, response: impl Into<String>) -> Self {
        lock(&self.responses).push_back(Ok(response.into()));
        self
    }

    /// Queue a response on a shared handle
    pub fn push_response(&self, response: impl Into<String>) {
        lock(&self.responses).push_back(Ok(response.into()));
    }

    /// Queue a failure on a shared handle
    pub fn push_error(&self, error: ProviderError) {
        lock(&self.responses).push_back(Err(error));
    }

    /// Sleep this long before answering each call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<CompletionCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Check if a user message containing the given text was sent
    pub fn was_called_with(&self, text: &str) -> bool {
        lock(&self.calls)
            .iter()
            .any(|call| call.messages.iter().any(|m| m.content.contains(text)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl BaseCompletionProvider for MockCompletionProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        lock(&self.calls).push(CompletionCall {
            messages,
            max_tokens,
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = lock(&self.responses).pop_front();
        next.unwrap_or_else(|| Ok("Mock summary".to_string()))
    }
}
