use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct RootResponse {
    message: &'static str,
}

/// `GET /`
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Summarizer API is running!",
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    redis: BackendHealth,
}

#[derive(Serialize)]
pub struct BackendHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Pings Redis (the queue, state store and cache backend) with a 5s timeout.
/// Without a Redis connection the in-memory stores are always reachable.
///
/// Returns 200 OK if healthy, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let redis_health = match &state.deps.redis {
        None => BackendHealth {
            status: "ok".to_string(),
            error: None,
        },
        Some(redis) => match tokio::time::timeout(Duration::from_secs(5), redis.ping()).await {
            Ok(Ok(())) => BackendHealth {
                status: "ok".to_string(),
                error: None,
            },
            Ok(Err(e)) => BackendHealth {
                status: "error".to_string(),
                error: Some(format!("Ping failed: {}", e)),
            },
            Err(_) => BackendHealth {
                status: "error".to_string(),
                error: Some("Ping timeout (>5s)".to_string()),
            },
        },
    };

    let is_healthy = redis_health.status == "ok";

    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            redis: redis_health,
        }),
    )
}
