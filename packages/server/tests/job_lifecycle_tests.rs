//! End-to-end job lifecycle: submit over HTTP, run the worker, poll status and result.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::TestHarness;
use summarizer_core::kernel::ProviderError;
use test_context::test_context;

fn rate_limited() -> ProviderError {
    ProviderError::RateLimited {
        message: "Rate limit reached for requests".into(),
        retry_after: None,
    }
}

#[test_context(TestHarness)]
#[tokio::test]
async fn quick_brown_fox_reaches_success(ctx: &TestHarness) {
    ctx.provider.push_response("A fox jumps over a dog.");

    let task_id = ctx
        .submit("The quick brown fox jumps over the lazy dog.", 50)
        .await;

    let (status, body) = ctx.status(&task_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "PENDING");
    assert_eq!(body["status"], "Task is waiting to be processed.");

    assert_eq!(ctx.run_worker().await, 1);

    let (status, body) = ctx.status(&task_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "SUCCESS");
    assert_eq!(body["result_ready"], true);

    let (status, body) = ctx.result(&task_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task_id"], task_id.as_str());
    assert_eq!(body["state"], "SUCCESS");
    assert_eq!(body["result"], "A fox jumps over a dog.");

    let call = &ctx.provider.calls()[0];
    assert_eq!(call.max_tokens, 125);
    assert!(ctx
        .provider
        .was_called_with("approximately 50 words: The quick brown fox"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn identical_submission_is_served_from_cache(ctx: &TestHarness) {
    ctx.provider.push_response("First summary.");

    let first = ctx.submit("Repeated input text.", 40).await;
    ctx.run_worker().await;
    let second = ctx.submit("Repeated input text.", 40).await;
    ctx.run_worker().await;

    assert_ne!(first, second);
    assert_eq!(ctx.provider.call_count(), 1);

    let (_, body) = ctx.result(&second).await;
    assert_eq!(body["result"], "First summary.");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn different_max_length_is_a_cache_miss(ctx: &TestHarness) {
    ctx.submit("Same text.", 40).await;
    ctx.submit("Same text.", 80).await;
    ctx.run_worker().await;

    assert_eq!(ctx.provider.call_count(), 2);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn authentication_failure_fails_without_retry(ctx: &TestHarness) {
    ctx.provider
        .push_error(ProviderError::Authentication("Incorrect API key provided".into()));

    let task_id = ctx.submit("Some text.", 50).await;
    assert_eq!(ctx.run_worker().await, 1);

    assert_eq!(ctx.provider.call_count(), 1);
    let (status, body) = ctx.status(&task_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "FAILURE");
    assert_eq!(
        body["error"],
        "Provider authentication failed: Incorrect API key provided"
    );

    let (status, body) = ctx.result(&task_id).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["state"], "FAILURE");
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("Incorrect API key provided"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn client_error_fails_without_retry(ctx: &TestHarness) {
    ctx.provider.push_error(ProviderError::Client {
        status: 400,
        message: "maximum context length exceeded".into(),
    });

    let task_id = ctx.submit("Some text.", 50).await;
    ctx.run_worker().await;

    assert_eq!(ctx.provider.call_count(), 1);
    let (_, body) = ctx.status(&task_id).await;
    assert_eq!(body["state"], "FAILURE");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn three_rate_limits_exhaust_the_budget(ctx: &TestHarness) {
    for _ in 0..3 {
        ctx.provider.push_error(rate_limited());
    }

    let task_id = ctx.submit("Some text.", 50).await;
    assert_eq!(ctx.run_worker().await, 3);

    assert_eq!(ctx.provider.call_count(), 3);
    let (_, body) = ctx.status(&task_id).await;
    assert_eq!(body["state"], "FAILURE");
    assert_eq!(
        body["error"],
        "Provider rate limit hit (gave up after 3 attempts)"
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn two_rate_limits_then_success(ctx: &TestHarness) {
    ctx.provider.push_error(rate_limited());
    ctx.provider.push_error(rate_limited());
    ctx.provider.push_response("Third time lucky.");

    let task_id = ctx.submit("Some text.", 50).await;
    assert_eq!(ctx.run_worker().await, 3);

    assert_eq!(ctx.provider.call_count(), 3);
    let (status, body) = ctx.result(&task_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "Third time lucky.");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn server_errors_are_retried(ctx: &TestHarness) {
    ctx.provider.push_error(ProviderError::Server {
        status: 503,
        message: "overloaded".into(),
    });
    ctx.provider.push_response("Recovered.");

    let task_id = ctx.submit("Some text.", 50).await;
    ctx.run_worker().await;

    assert_eq!(ctx.provider.call_count(), 2);
    let (_, body) = ctx.result(&task_id).await;
    assert_eq!(body["result"], "Recovered.");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn retry_state_is_visible_between_attempts(ctx: &TestHarness) {
    ctx.provider.push_error(rate_limited());

    let task_id = ctx.submit("Some text.", 50).await;
    assert!(ctx.worker.run_once().await.unwrap());

    let (_, body) = ctx.status(&task_id).await;
    assert_eq!(body["state"], "RETRY");
    assert_eq!(
        body["status"],
        "Provider rate limit hit, retrying in 0s (1/3)"
    );

    let (status, body) = ctx.result(&task_id).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["state"], "RETRY");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn terminal_state_does_not_change(ctx: &TestHarness) {
    ctx.provider.push_response("Done.");
    let task_id = ctx.submit("Some text.", 50).await;
    ctx.run_worker().await;

    // A duplicate delivery of the same job must not disturb the result.
    let record = ctx.deps.job_store.get(&task_id).await.unwrap().unwrap();
    let duplicate = summarizer_core::kernel::jobs::SummarizeJob {
        job_id: task_id.clone(),
        text: "Some text.".into(),
        max_length: record.max_length,
        attempt: 1,
        first_attempt_at: None,
    };
    ctx.deps.queue.enqueue(&duplicate).await.unwrap();
    ctx.run_worker().await;

    for _ in 0..3 {
        let (_, body) = ctx.result(&task_id).await;
        assert_eq!(body["state"], "SUCCESS");
        assert_eq!(body["result"], "Done.");
    }
    assert_eq!(ctx.provider.call_count(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn cache_outage_is_retried_not_treated_as_miss(ctx: &TestHarness) {
    ctx.cache.set_unavailable(true);
    let task_id = ctx.submit("Some text.", 50).await;
    assert!(ctx.worker.run_once().await.unwrap());

    assert_eq!(ctx.provider.call_count(), 0);
    let (_, body) = ctx.status(&task_id).await;
    assert_eq!(body["state"], "RETRY");

    ctx.cache.set_unavailable(false);
    ctx.run_worker().await;
    let (_, body) = ctx.status(&task_id).await;
    assert_eq!(body["state"], "SUCCESS");
    assert_eq!(ctx.provider.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn expired_cache_entry_forces_fresh_call() {
    let mut settings = TestHarness::default_settings();
    settings.cache_ttl = Duration::from_secs(60);
    let ctx = TestHarness::with_settings(settings);

    ctx.submit("Expiring text.", 30).await;
    ctx.run_worker().await;
    assert_eq!(ctx.cache.len(), 1);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(ctx.cache.is_empty());

    ctx.submit("Expiring text.", 30).await;
    ctx.run_worker().await;
    assert_eq!(ctx.provider.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn queued_job_outlives_retention_window() {
    let mut settings = TestHarness::default_settings();
    settings.result_ttl = Duration::from_secs(10);
    let ctx = TestHarness::with_settings(settings);
    ctx.provider.push_response("Eventually summarized.");

    let task_id = ctx.submit("Backlogged text.", 30).await;
    tokio::time::advance(Duration::from_secs(11)).await;

    assert_eq!(ctx.deps.queue.depth().await.unwrap(), 1);
    let (status, body) = ctx.status(&task_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "PENDING");

    assert_eq!(ctx.run_worker().await, 1);
    let (status, body) = ctx.result(&task_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "Eventually summarized.");

    // Retention counts from completion
    tokio::time::advance(Duration::from_secs(11)).await;
    let (status, _) = ctx.status(&task_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
