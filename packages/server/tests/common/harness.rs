//! Test harness for end-to-end job lifecycle tests.
//!
//! Wires the HTTP router and a single worker to in-memory stores and a scripted
//! completion provider. Retry delays are zero so retried jobs are claimable
//! immediately and a test can drain the queue synchronously.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use summarizer_core::config::RetrySettings;
use summarizer_core::domains::summarization::SummarizeHandler;
use summarizer_core::kernel::jobs::{
    JobWorker, JobWorkerConfig, MemoryJobQueue, MemoryJobStateStore,
};
use summarizer_core::kernel::{JobSettings, MemoryContentCache, MockCompletionProvider, ServerDeps};
use summarizer_core::server::build_app;
use test_context::AsyncTestContext;
use tower::ServiceExt;

/// Test harness that manages test infrastructure.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let (status, body) = ctx.submit("some text", 50).await;
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    pub deps: ServerDeps,
    pub provider: MockCompletionProvider,
    pub cache: Arc<MemoryContentCache>,
    pub queue: Arc<MemoryJobQueue>,
    pub worker: JobWorker,
    app: Router,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new()
    }

    async fn teardown(self) {
        // In-memory stores are dropped with the harness
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_settings(Self::default_settings())
    }

    pub fn default_settings() -> JobSettings {
        JobSettings {
            result_ttl: Duration::from_secs(3600),
            cache_ttl: Duration::from_secs(3600),
            retry: RetrySettings {
                default_delay: Duration::ZERO,
                ..RetrySettings::default()
            },
        }
    }

    pub fn with_settings(settings: JobSettings) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let cache = Arc::new(MemoryContentCache::new());
        let queue = Arc::new(MemoryJobQueue::new());
        let deps = ServerDeps::new(
            queue.clone(),
            Arc::new(MemoryJobStateStore::new()),
            cache.clone(),
            settings,
        );

        let provider = MockCompletionProvider::new();
        let handler = Arc::new(SummarizeHandler::new(
            deps.clone(),
            Arc::new(provider.clone()),
        ));
        let worker = JobWorker::with_config(
            deps.clone(),
            handler,
            JobWorkerConfig::with_worker_id("test-worker"),
        );

        Self {
            app: build_app(deps.clone()),
            deps,
            provider,
            cache,
            queue,
            worker,
        }
    }

    /// Send a request through the router and decode the JSON body.
    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(
            Request::get(uri)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("valid request"),
        )
        .await
    }

    /// Submit a summarization request; returns the task id on 202.
    pub async fn submit(&self, text: &str, max_length: u32) -> String {
        let (status, body) = self
            .post_json(
                "/api/v1/summarize",
                serde_json::json!({ "text": text, "max_length": max_length }),
            )
            .await;
        assert_eq!(status, StatusCode::ACCEPTED, "submit failed: {}", body);
        body["task_id"]
            .as_str()
            .expect("task_id in response")
            .to_string()
    }

    pub async fn status(&self, task_id: &str) -> (StatusCode, Value) {
        self.get(&format!("/api/v1/status/{}", task_id)).await
    }

    pub async fn result(&self, task_id: &str) -> (StatusCode, Value) {
        self.get(&format!("/api/v1/result/{}", task_id)).await
    }

    /// Let the worker process jobs until the queue is empty. Returns how many it ran.
    pub async fn run_worker(&self) -> usize {
        let mut processed = 0;
        while self.worker.run_once().await.expect("claim failed") {
            processed += 1;
        }
        processed
    }
}
