//! JSON error responses for the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domains::summarization::SubmitError;
use crate::kernel::StoreError;

/// Structured error body: `{ "detail", "task_id"?, "state"? }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                detail: detail.into(),
                task_id: None,
                state: None,
            },
        }
    }

    pub fn not_found(task_id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("Task ID '{}' not found or invalid.", task_id),
        )
        .with_task_id(task_id)
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.body.task_id = Some(task_id.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.body.state = Some(state.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Invalid(detail) => Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail),
            SubmitError::Enqueue(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to initiate summarization task.",
            ),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "Job store request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Job state is temporarily unavailable.",
        )
    }
}
