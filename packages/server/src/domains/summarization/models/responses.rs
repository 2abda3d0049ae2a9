use serde::Serialize;

use crate::kernel::jobs::{JobRecord, JobState};

/// `202` body for an accepted submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub task_id: String,
}

/// Current state of a job plus a human-readable status line.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub task_id: String,
    pub state: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ready: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&JobRecord> for StatusResponse {
    fn from(record: &JobRecord) -> Self {
        let (result_ready, error) = match &record.state {
            JobState::Success { .. } => (Some(true), None),
            JobState::Failure { error } => (None, Some(error.clone())),
            _ => (None, None),
        };
        Self {
            task_id: record.job_id.clone(),
            state: record.state.kind().to_string(),
            status: record.state.status_line(),
            result_ready,
            error,
        }
    }
}

/// Finished summary.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResultResponse {
    pub task_id: String,
    pub state: String,
    pub result: String,
}
