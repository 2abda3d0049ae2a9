use tracing::debug;

use crate::domains::summarization::models::StatusResponse;
use crate::kernel::jobs::{JobState, StateKind};
use crate::kernel::{ServerDeps, StoreResult};

/// What a result query found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultLookup {
    Ready { result: String },
    /// Still PENDING, STARTED, PROGRESS or RETRY
    NotComplete { state: StateKind },
    Failed { error: String },
    NotFound,
}

/// Current state of a job, or `None` if the identifier is unknown or expired.
pub async fn get_job_status(
    job_id: &str,
    deps: &ServerDeps,
) -> StoreResult<Option<StatusResponse>> {
    let record = deps.job_store.get(job_id).await?;
    debug!(job_id, found = record.is_some(), "Status lookup");
    Ok(record.as_ref().map(StatusResponse::from))
}

pub async fn get_job_result(job_id: &str, deps: &ServerDeps) -> StoreResult<ResultLookup> {
    let Some(record) = deps.job_store.get(job_id).await? else {
        return Ok(ResultLookup::NotFound);
    };

    Ok(match record.state {
        JobState::Success { result } => ResultLookup::Ready { result },
        JobState::Failure { error } => ResultLookup::Failed { error },
        other => ResultLookup::NotComplete {
            state: other.kind(),
        },
    })
}
