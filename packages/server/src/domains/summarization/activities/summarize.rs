//! One attempt of a summarization job: cache lookup, provider call, cache store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::common::utils::summary_cache_key;
use crate::kernel::jobs::{AttemptOutcome, JobHandler, JobReporter, SummarizeJob};
use crate::kernel::{BaseCompletionProvider, Message, ProviderError, ServerDeps, StoreResult};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes text concisely.";

/// Output tokens allowed beyond the requested word count.
const TOKEN_HEADROOM: u32 = 75;

pub const PROGRESS_MESSAGE: &str = "Calling summarization provider...";

/// Conversation sent to the provider for one summary.
pub fn build_prompt(text: &str, max_length: u32) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(format!(
            "Summarize the following text in approximately {} words: {}",
            max_length, text
        )),
    ]
}

pub fn token_budget(max_length: u32) -> u32 {
    max_length.saturating_add(TOKEN_HEADROOM)
}

/// Map a provider failure onto the retry policy.
pub fn outcome_for(error: &ProviderError) -> AttemptOutcome {
    match error {
        ProviderError::Authentication(message) => AttemptOutcome::Fail {
            reason: format!("Provider authentication failed: {}", message),
        },
        ProviderError::RateLimited { retry_after, .. } => AttemptOutcome::Retry {
            delay: *retry_after,
            reason: "Provider rate limit hit".to_string(),
        },
        ProviderError::Server { status, .. } => AttemptOutcome::Retry {
            delay: None,
            reason: format!("Provider error ({})", status),
        },
        ProviderError::Client { status, message } => AttemptOutcome::Fail {
            reason: format!("Provider error ({}): {}", status, message),
        },
        ProviderError::Transport(_) => AttemptOutcome::Retry {
            delay: None,
            reason: "Provider unreachable".to_string(),
        },
        ProviderError::Unexpected(_) => AttemptOutcome::Retry {
            delay: None,
            reason: "Unexpected error".to_string(),
        },
    }
}

/// Runs summarization attempts for workers.
pub struct SummarizeHandler {
    deps: ServerDeps,
    provider: Arc<dyn BaseCompletionProvider>,
}

impl SummarizeHandler {
    pub fn new(deps: ServerDeps, provider: Arc<dyn BaseCompletionProvider>) -> Self {
        Self { deps, provider }
    }
}

#[async_trait]
impl JobHandler for SummarizeHandler {
    async fn run_attempt(
        &self,
        job: &SummarizeJob,
        reporter: &mut JobReporter,
    ) -> StoreResult<AttemptOutcome> {
        let cache_key = summary_cache_key(&job.text, job.max_length);

        match self.deps.cache.get(&cache_key).await {
            Ok(Some(summary)) => {
                info!(job_id = %job.job_id, cache_key = %cache_key, "Cache hit");
                return Ok(AttemptOutcome::Success { result: summary });
            }
            Ok(None) => {
                info!(job_id = %job.job_id, cache_key = %cache_key, "Cache miss, calling provider");
            }
            Err(e) => {
                warn!(job_id = %job.job_id, error = %e, "Cache lookup failed");
                return Ok(AttemptOutcome::Retry {
                    delay: None,
                    reason: "Cache unavailable".to_string(),
                });
            }
        }

        reporter.progress(PROGRESS_MESSAGE).await?;

        let timeout = self.deps.settings.retry.provider_timeout;
        let call = self.provider.complete(
            build_prompt(&job.text, job.max_length),
            token_budget(job.max_length),
        );
        let summary = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                warn!(job_id = %job.job_id, attempt = job.attempt, error = %e, "Provider call failed");
                return Ok(outcome_for(&e));
            }
            Err(_) => {
                warn!(
                    job_id = %job.job_id,
                    attempt = job.attempt,
                    timeout_secs = timeout.as_secs(),
                    "Provider call timed out"
                );
                return Ok(AttemptOutcome::Retry {
                    delay: None,
                    reason: format!("Provider call timed out after {}s", timeout.as_secs()),
                });
            }
        };

        if let Err(e) = self
            .deps
            .cache
            .set(&cache_key, &summary, self.deps.settings.cache_ttl)
            .await
        {
            warn!(job_id = %job.job_id, error = %e, "Failed to cache summary");
        } else {
            info!(job_id = %job.job_id, cache_key = %cache_key, "Summary cached");
        }

        Ok(AttemptOutcome::Success { result: summary })
    }
}
