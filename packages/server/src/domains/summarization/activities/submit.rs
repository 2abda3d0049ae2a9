use thiserror::Error;
use tracing::{error, info, warn};

use crate::domains::summarization::models::SummarizeRequest;
use crate::kernel::jobs::JobRecord;
use crate::kernel::{ServerDeps, StoreError};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Invalid(String),

    #[error("failed to enqueue summarization job: {0}")]
    Enqueue(#[from] StoreError),
}

/// Accept a summarization request and return the new job's identifier.
///
/// The PENDING record is written before the job is enqueued so a fast worker
/// always finds it. If enqueueing fails the record is removed again and no
/// identifier is handed out.
pub async fn submit_summarization(
    request: SummarizeRequest,
    deps: &ServerDeps,
) -> Result<String, SubmitError> {
    let job = request.into_job().map_err(SubmitError::Invalid)?;
    let job_id = job.job_id.clone();

    deps.job_store
        .put(&JobRecord::pending(&job), deps.settings.result_ttl)
        .await?;

    if let Err(e) = deps.queue.enqueue(&job).await {
        error!(job_id = %job_id, error = %e, "Failed to enqueue summarization job");
        if let Err(cleanup) = deps.job_store.delete(&job_id).await {
            warn!(job_id = %job_id, error = %cleanup, "Failed to remove orphaned job record");
        }
        return Err(SubmitError::Enqueue(e));
    }

    info!(
        job_id = %job_id,
        max_length = job.max_length,
        text_len = job.text.len(),
        "Sent job for summarization"
    );
    Ok(job_id)
}
