use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::domains::summarization::{
    get_job_result, get_job_status, submit_summarization, ResultLookup, ResultResponse,
    StatusResponse, SubmitResponse, SummarizeRequest,
};
use crate::kernel::jobs::StateKind;
use crate::server::app::AppState;
use crate::server::error::ApiError;

/// `POST /api/v1/summarize`
pub async fn submit_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let task_id = submit_summarization(request, &state.deps).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { task_id })))
}

/// `GET /api/v1/status/:task_id`
pub async fn status_handler(
    Extension(state): Extension<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    match get_job_status(&task_id, &state.deps).await? {
        Some(status) => Ok(Json(status)),
        None => Err(ApiError::not_found(&task_id)),
    }
}

/// `GET /api/v1/result/:task_id`
///
/// 200 with the summary, 202 while the job is still running, 500 if it failed.
pub async fn result_handler(
    Extension(state): Extension<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    match get_job_result(&task_id, &state.deps).await? {
        ResultLookup::Ready { result } => Ok(Json(ResultResponse {
            task_id,
            state: StateKind::Success.to_string(),
            result,
        })),
        ResultLookup::NotComplete { state: kind } => Err(ApiError::new(
            StatusCode::ACCEPTED,
            format!(
                "Task '{}' is not completed yet. Current state: {}",
                task_id, kind
            ),
        )
        .with_task_id(task_id)
        .with_state(kind.to_string())),
        ResultLookup::Failed { error } => {
            info!(task_id = %task_id, error = %error, "Result requested for failed task");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Task '{}' failed. Error: {}", task_id, error),
            )
            .with_task_id(task_id)
            .with_state(StateKind::Failure.to_string()))
        }
        ResultLookup::NotFound => Err(ApiError::not_found(&task_id)),
    }
}
