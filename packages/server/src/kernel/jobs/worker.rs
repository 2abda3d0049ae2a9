//! Job worker service for processing summarization jobs.
//!
//! Each `JobWorker` owns at most one job at a time:
//!
//! ```text
//! JobWorker
//!     │
//!     ├─► Claim from JobQueue (onto this worker's processing list)
//!     ├─► Load JobRecord, publish STARTED
//!     ├─► JobHandler.run_attempt(job) ─► AttemptOutcome
//!     │       Success ─► SUCCESS
//!     │       Retry   ─► RETRY + delayed re-enqueue, or FAILURE when exhausted
//!     │       Fail    ─► FAILURE
//!     └─► Ack
//! ```
//!
//! A store failure anywhere on this path leaves the job un-acked; the worker
//! hands it back to the queue via `recover` the next time it starts. While a
//! worker runs it renews a lease on the queue; if it dies for good, any other
//! worker's sweep returns its processing list to the queue once the lease lapses.
//! A panic inside an attempt counts as a recoverable failure of that attempt.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::job::{JobState, StateKind, SummarizeJob};
use super::queue::ClaimedJob;
use super::reporter::JobReporter;
use crate::config::RetrySettings;
use crate::kernel::deps::ServerDeps;
use crate::kernel::error::StoreResult;

/// What one attempt decided. The worker turns it into state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { result: String },
    /// Recoverable; `delay` overrides the default backoff when set
    Retry {
        delay: Option<Duration>,
        reason: String,
    },
    Fail { reason: String },
}

/// Runs one attempt of a job. Implementations publish `PROGRESS` themselves;
/// every other transition is the worker's.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run_attempt(
        &self,
        job: &SummarizeJob,
        reporter: &mut JobReporter,
    ) -> StoreResult<AttemptOutcome>;
}

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct JobWorkerConfig {
    /// Worker ID for this instance; names its processing list
    pub worker_id: String,
    /// How long to wait when no jobs are available
    pub poll_interval: Duration,
    /// How long this worker's claim on its processing list survives without a heartbeat
    pub lease_duration: Duration,
}

impl Default for JobWorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", Uuid::new_v4()),
            poll_interval: Duration::from_millis(500),
            lease_duration: Duration::from_secs(30),
        }
    }
}

impl JobWorkerConfig {
    /// Create a new config with a specific worker ID.
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }

    /// Heartbeats land three times per lease.
    pub fn heartbeat_interval(&self) -> Duration {
        (self.lease_duration / 3).max(Duration::from_millis(10))
    }
}

/// Whether another attempt may follow attempt `attempt`, starting after `delay`.
pub fn may_retry(
    retry: &RetrySettings,
    attempt: u32,
    first_attempt_at: DateTime<Utc>,
    delay: Duration,
    now: DateTime<Utc>,
) -> bool {
    if attempt >= retry.max_attempts {
        return false;
    }
    let elapsed = (now - first_attempt_at).to_std().unwrap_or(Duration::ZERO);
    elapsed.saturating_add(delay) <= retry.max_window
}

pub struct JobWorker {
    deps: ServerDeps,
    handler: Arc<dyn JobHandler>,
    config: JobWorkerConfig,
}

impl JobWorker {
    pub fn new(deps: ServerDeps, handler: Arc<dyn JobHandler>) -> Self {
        Self::with_config(deps, handler, JobWorkerConfig::default())
    }

    pub fn with_config(
        deps: ServerDeps,
        handler: Arc<dyn JobHandler>,
        config: JobWorkerConfig,
    ) -> Self {
        Self {
            deps,
            handler,
            config,
        }
    }

    /// Claim and process at most one job. Returns `false` when the queue was empty.
    pub async fn run_once(&self) -> StoreResult<bool> {
        let Some(claimed) = self.deps.queue.claim(&self.config.worker_id).await? else {
            return Ok(false);
        };

        let job_id = claimed.job.job_id.clone();
        if let Err(e) = self.process_job(&claimed).await {
            error!(
                job_id = %job_id,
                worker_id = %self.config.worker_id,
                error = %e,
                "store failure while processing job; left for recovery"
            );
        }
        Ok(true)
    }

    /// Drive one claimed job to its next resting state and acknowledge it.
    async fn process_job(&self, claimed: &ClaimedJob) -> StoreResult<()> {
        let job = &claimed.job;
        let retry = self.deps.settings.retry;
        let mut reporter = JobReporter::load(
            self.deps.job_store.clone(),
            job,
            self.deps.settings.result_ttl,
        )
        .await?;

        if reporter.state().is_terminal() {
            debug!(job_id = %job.job_id, state = %reporter.state().kind(), "job already finished");
            return self.deps.queue.ack(&self.config.worker_id, claimed).await;
        }

        let now = Utc::now();
        let first_attempt_at = job.first_attempt_at.unwrap_or(now);

        let previous_attempt = job.attempt.saturating_sub(1);
        if reporter.state().kind() == StateKind::Retry
            && !may_retry(&retry, previous_attempt, first_attempt_at, Duration::ZERO, now)
        {
            warn!(job_id = %job.job_id, attempt = job.attempt, "retry budget exhausted before attempt");
            reporter
                .transition(JobState::Failure {
                    error: format!(
                        "retry budget exhausted (gave up after {} attempts)",
                        previous_attempt
                    ),
                })
                .await?;
            return self.deps.queue.ack(&self.config.worker_id, claimed).await;
        }

        if !reporter.begin_attempt(job.attempt).await? {
            return self.deps.queue.ack(&self.config.worker_id, claimed).await;
        }

        info!(job_id = %job.job_id, attempt = job.attempt, "processing job");
        let attempt = AssertUnwindSafe(self.handler.run_attempt(job, &mut reporter))
            .catch_unwind()
            .await;
        let outcome = match attempt {
            Ok(outcome) => outcome?,
            Err(_) => {
                error!(job_id = %job.job_id, attempt = job.attempt, "job attempt panicked");
                AttemptOutcome::Retry {
                    delay: None,
                    reason: "Unexpected error".to_string(),
                }
            }
        };

        match outcome {
            AttemptOutcome::Success { result } => {
                reporter.transition(JobState::Success { result }).await?;
                info!(job_id = %job.job_id, attempt = job.attempt, "job succeeded");
            }
            AttemptOutcome::Retry { delay, reason } => {
                let delay = delay.unwrap_or(retry.default_delay);
                self.enter_progress(&mut reporter, &reason).await?;

                if may_retry(&retry, job.attempt, first_attempt_at, delay, Utc::now()) {
                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    let message = format!(
                        "{}, retrying in {}s ({}/{})",
                        reason,
                        delay.as_secs_f64(),
                        job.attempt,
                        retry.max_attempts
                    );
                    warn!(
                        job_id = %job.job_id,
                        attempt = job.attempt,
                        delay_ms,
                        reason = %reason,
                        "job will be retried"
                    );
                    let published = reporter
                        .transition(JobState::Retry {
                            attempt: job.attempt,
                            max_attempts: retry.max_attempts,
                            delay_ms,
                            message,
                        })
                        .await?;
                    if published {
                        self.deps
                            .queue
                            .enqueue_delayed(&job.next_attempt(first_attempt_at), delay)
                            .await?;
                    }
                } else {
                    let error = format!("{} (gave up after {} attempts)", reason, job.attempt);
                    error!(job_id = %job.job_id, attempt = job.attempt, error = %error, "job failed");
                    reporter.transition(JobState::Failure { error }).await?;
                }
            }
            AttemptOutcome::Fail { reason } => {
                self.enter_progress(&mut reporter, &reason).await?;
                error!(job_id = %job.job_id, attempt = job.attempt, error = %reason, "job failed");
                reporter.transition(JobState::Failure { error: reason }).await?;
            }
        }

        self.deps.queue.ack(&self.config.worker_id, claimed).await
    }

    /// RETRY and FAILURE are only reachable from PROGRESS.
    async fn enter_progress(&self, reporter: &mut JobReporter, reason: &str) -> StoreResult<()> {
        if reporter.state().kind() == StateKind::Started {
            reporter.progress(reason).await?;
        }
        Ok(())
    }

    /// Poll until `shutdown` fires. The job in hand is finished before returning.
    pub async fn run(&self, shutdown: CancellationToken) {
        let worker_id = self.config.worker_id.as_str();
        info!(worker_id, "job worker starting");

        match self.deps.queue.recover(worker_id).await {
            Ok(0) => {}
            Ok(moved) => info!(worker_id, moved, "re-queued jobs left by a previous run"),
            Err(e) => error!(worker_id, error = %e, "failed to recover in-flight jobs"),
        }
        beat(&self.deps, &self.config).await;

        // Stops the heartbeat however this worker exits, unwinding included
        let heartbeat_stop = CancellationToken::new();
        let _heartbeat_guard = heartbeat_stop.clone().drop_guard();
        let heartbeat = tokio::spawn(run_heartbeat(
            self.deps.clone(),
            self.config.clone(),
            heartbeat_stop.clone(),
        ));

        while !shutdown.is_cancelled() {
            let idle = match self.run_once().await {
                Ok(processed) => !processed,
                Err(e) => {
                    error!(worker_id, error = %e, "failed to claim job");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }

        heartbeat_stop.cancel();
        let _ = heartbeat.await;
        if let Err(e) = self.deps.queue.retire(worker_id).await {
            warn!(worker_id, error = %e, "failed to release worker lease");
        }
        info!(worker_id, "job worker stopped");
    }
}

/// Renew the lease, then sweep workers whose leases lapsed.
async fn beat(deps: &ServerDeps, config: &JobWorkerConfig) {
    let worker_id = config.worker_id.as_str();
    if let Err(e) = deps.queue.heartbeat(worker_id, config.lease_duration).await {
        warn!(worker_id, error = %e, "heartbeat failed");
    }
    match deps.queue.reclaim_expired().await {
        Ok(0) => {}
        Ok(moved) => info!(worker_id, moved, "re-queued jobs from stopped workers"),
        Err(e) => warn!(worker_id, error = %e, "failed to sweep lapsed leases"),
    }
}

async fn run_heartbeat(deps: ServerDeps, config: JobWorkerConfig, stop: CancellationToken) {
    let mut interval = tokio::time::interval(config.heartbeat_interval());
    interval.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = interval.tick() => beat(&deps, &config).await,
        }
    }
}

// =============================================================================
// WorkerPool
// =============================================================================

/// N workers in one process, sharing `ServerDeps`. A worker that panics is
/// restarted under the same id, which hands its in-flight job back first.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers named `{pool_id}-{i}`, each configured like `template`.
    pub fn spawn(
        deps: ServerDeps,
        handler: Arc<dyn JobHandler>,
        pool_id: &str,
        size: usize,
        template: JobWorkerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let handles = (0..size)
            .map(|i| {
                let config = JobWorkerConfig {
                    worker_id: format!("{}-{}", pool_id, i),
                    ..template.clone()
                };
                tokio::spawn(supervise(
                    deps.clone(),
                    handler.clone(),
                    config,
                    shutdown.clone(),
                ))
            })
            .collect();

        info!(pool_id, size, "worker pool started");
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to stop.
    pub async fn join(self) {
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                error!(error = %e, "worker supervisor failed");
            }
        }
    }
}

async fn supervise(
    deps: ServerDeps,
    handler: Arc<dyn JobHandler>,
    config: JobWorkerConfig,
    shutdown: CancellationToken,
) {
    loop {
        let worker = JobWorker::with_config(deps.clone(), handler.clone(), config.clone());
        let run_shutdown = shutdown.clone();
        match tokio::spawn(async move { worker.run(run_shutdown).await }).await {
            Ok(()) => break,
            Err(e) if e.is_panic() && !shutdown.is_cancelled() => {
                error!(worker_id = %config.worker_id, error = %e, "worker panicked; restarting");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(config.poll_interval) => {}
                }
            }
            Err(e) => {
                error!(worker_id = %config.worker_id, error = %e, "worker task ended abnormally");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use crate::kernel::cache::MemoryContentCache;
    use crate::kernel::deps::JobSettings;
    use crate::kernel::jobs::{JobQueue, JobRecord, MemoryJobQueue, MemoryJobStateStore};

    /// Handler that replays scripted outcomes.
    struct ScriptedHandler {
        outcomes: Mutex<VecDeque<AttemptOutcome>>,
    }

    impl ScriptedHandler {
        fn new(outcomes: Vec<AttemptOutcome>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
            })
        }
    }

    #[async_trait]
    impl JobHandler for ScriptedHandler {
        async fn run_attempt(
            &self,
            _job: &SummarizeJob,
            reporter: &mut JobReporter,
        ) -> StoreResult<AttemptOutcome> {
            reporter.progress("working").await?;
            Ok(self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted outcome left"))
        }
    }

    fn settings() -> JobSettings {
        JobSettings {
            retry: RetrySettings {
                default_delay: Duration::ZERO,
                ..RetrySettings::default()
            },
            ..JobSettings::default()
        }
    }

    async fn submit(deps: &ServerDeps, job: &SummarizeJob) {
        deps.job_store
            .put(&JobRecord::pending(job), deps.settings.result_ttl)
            .await
            .unwrap();
        deps.queue.enqueue(job).await.unwrap();
    }

    async fn drain(worker: &JobWorker) -> usize {
        let mut processed = 0;
        while worker.run_once().await.unwrap() {
            processed += 1;
        }
        processed
    }

    async fn state_of(deps: &ServerDeps, job: &SummarizeJob) -> JobState {
        deps.job_store
            .get(&job.job_id)
            .await
            .unwrap()
            .unwrap()
            .state
    }

    #[tokio::test]
    async fn test_retry_message_keeps_fractional_delay() {
        let deps = ServerDeps::in_memory(settings());
        let handler = ScriptedHandler::new(vec![AttemptOutcome::Retry {
            delay: Some(Duration::from_millis(1500)),
            reason: "rate limited".into(),
        }]);
        let worker = JobWorker::new(deps.clone(), handler);
        let job = SummarizeJob::new("text", 50);
        submit(&deps, &job).await;

        assert!(worker.run_once().await.unwrap());
        match state_of(&deps, &job).await {
            JobState::Retry {
                delay_ms, message, ..
            } => {
                assert_eq!(delay_ms, 1500);
                assert_eq!(message, "rate limited, retrying in 1.5s (1/3)");
            }
            other => panic!("expected RETRY, got {:?}", other),
        }
    }

    fn retry_outcome() -> AttemptOutcome {
        AttemptOutcome::Retry {
            delay: None,
            reason: "rate limited".into(),
        }
    }

    #[tokio::test]
    async fn test_success_path() {
        let deps = ServerDeps::in_memory(settings());
        let handler = ScriptedHandler::new(vec![AttemptOutcome::Success {
            result: "short".into(),
        }]);
        let worker = JobWorker::new(deps.clone(), handler);
        let job = SummarizeJob::new("text", 50);
        submit(&deps, &job).await;

        assert_eq!(drain(&worker).await, 1);
        assert_eq!(
            state_of(&deps, &job).await,
            JobState::Success {
                result: "short".into()
            }
        );
        assert_eq!(deps.queue.depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retries_until_budget_exhausted() {
        let deps = ServerDeps::in_memory(settings());
        let handler =
            ScriptedHandler::new(vec![retry_outcome(), retry_outcome(), retry_outcome()]);
        let worker = JobWorker::new(deps.clone(), handler.clone());
        let job = SummarizeJob::new("text", 50);
        submit(&deps, &job).await;

        assert_eq!(drain(&worker).await, 3);
        match state_of(&deps, &job).await {
            JobState::Failure { error } => {
                assert_eq!(error, "rate limited (gave up after 3 attempts)")
            }
            other => panic!("expected FAILURE, got {:?}", other),
        }
        assert!(handler.outcomes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retry_record_carries_attempt_counts() {
        let deps = ServerDeps::in_memory(settings());
        let handler = ScriptedHandler::new(vec![retry_outcome()]);
        let worker = JobWorker::new(deps.clone(), handler);
        let job = SummarizeJob::new("text", 50);
        submit(&deps, &job).await;

        assert!(worker.run_once().await.unwrap());
        match state_of(&deps, &job).await {
            JobState::Retry {
                attempt,
                max_attempts,
                message,
                ..
            } => {
                assert_eq!((attempt, max_attempts), (1, 3));
                assert_eq!(message, "rate limited, retrying in 0s (1/3)");
            }
            other => panic!("expected RETRY, got {:?}", other),
        }
        assert_eq!(deps.queue.depth().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_terminal_job_is_acked_without_running() {
        let deps = ServerDeps::in_memory(settings());
        let handler = ScriptedHandler::new(vec![]);
        let worker = JobWorker::new(deps.clone(), handler);
        let job = SummarizeJob::new("text", 50);
        let done = JobRecord::pending(&job).with_state(JobState::Failure {
            error: "earlier".into(),
        });
        deps.job_store.put(&done, deps.settings.result_ttl).await.unwrap();
        deps.queue.enqueue(&job).await.unwrap();

        assert_eq!(drain(&worker).await, 1);
        assert_eq!(state_of(&deps, &job).await, done.state);
    }

    #[tokio::test]
    async fn test_exhausted_window_fails_redelivered_retry() {
        let deps = ServerDeps::in_memory(settings());
        let handler = ScriptedHandler::new(vec![]);
        let worker = JobWorker::new(deps.clone(), handler);

        let job = SummarizeJob::new("text", 50);
        let long_ago = Utc::now() - chrono::Duration::hours(1);
        let redelivered = job.next_attempt(long_ago);
        let record = JobRecord::pending(&job)
            .with_state(JobState::Started { attempt: 1 })
            .with_state(JobState::Progress {
                message: "working".into(),
            })
            .with_state(JobState::Retry {
                attempt: 1,
                max_attempts: 3,
                delay_ms: 0,
                message: "rate limited".into(),
            });
        deps.job_store.put(&record, deps.settings.result_ttl).await.unwrap();
        deps.queue.enqueue(&redelivered).await.unwrap();

        assert_eq!(drain(&worker).await, 1);
        assert_eq!(state_of(&deps, &job).await.kind(), StateKind::Failure);
    }

    #[test]
    fn test_may_retry_budget_and_window() {
        let retry = RetrySettings::default();
        let now = Utc::now();
        assert!(may_retry(&retry, 1, now, Duration::from_secs(10), now));
        assert!(may_retry(&retry, 2, now, Duration::from_secs(10), now));
        assert!(!may_retry(&retry, 3, now, Duration::from_secs(10), now));

        let started = now - chrono::Duration::seconds(595);
        assert!(!may_retry(&retry, 1, started, Duration::from_secs(10), now));
    }

    fn fast_config(worker_id: &str) -> JobWorkerConfig {
        JobWorkerConfig {
            worker_id: worker_id.to_string(),
            poll_interval: Duration::from_millis(10),
            lease_duration: Duration::from_secs(30),
        }
    }

    async fn wait_for(deps: &ServerDeps, job: &SummarizeJob, kind: StateKind) {
        tokio::time::timeout(Duration::from_secs(60), async {
            while state_of(deps, job).await.kind() != kind {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job should reach the expected state");
    }

    /// Panics on its first attempt, succeeds afterwards.
    struct PanicOnceHandler {
        panicked: AtomicBool,
    }

    #[async_trait]
    impl JobHandler for PanicOnceHandler {
        async fn run_attempt(
            &self,
            _job: &SummarizeJob,
            reporter: &mut JobReporter,
        ) -> StoreResult<AttemptOutcome> {
            reporter.progress("working").await?;
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("handler bug");
            }
            Ok(AttemptOutcome::Success {
                result: "recovered".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_panicking_attempt_is_retried() {
        let deps = ServerDeps::in_memory(settings());
        let handler = Arc::new(PanicOnceHandler {
            panicked: AtomicBool::new(false),
        });
        let worker = JobWorker::new(deps.clone(), handler);
        let job = SummarizeJob::new("text", 50);
        submit(&deps, &job).await;

        assert!(worker.run_once().await.unwrap());
        match state_of(&deps, &job).await {
            JobState::Retry { message, .. } => {
                assert_eq!(message, "Unexpected error, retrying in 0s (1/3)")
            }
            other => panic!("expected RETRY, got {:?}", other),
        }

        assert_eq!(drain(&worker).await, 1);
        assert_eq!(
            state_of(&deps, &job).await,
            JobState::Success {
                result: "recovered".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_worker_rescues_jobs_of_stopped_worker() {
        let deps = ServerDeps::in_memory(settings());
        let job = SummarizeJob::new("text", 50);
        submit(&deps, &job).await;

        // A worker from another process claimed the job and never came back
        deps.queue
            .heartbeat("crashed-0", Duration::from_secs(30))
            .await
            .unwrap();
        deps.queue.claim("crashed-0").await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;

        let handler = ScriptedHandler::new(vec![AttemptOutcome::Success {
            result: "rescued".into(),
        }]);
        let worker = JobWorker::with_config(deps.clone(), handler, fast_config("survivor-0"));
        let shutdown = CancellationToken::new();
        let running = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { worker.run(shutdown).await }
        });

        wait_for(&deps, &job, StateKind::Success).await;
        shutdown.cancel();
        running.await.unwrap();
    }

    /// Queue whose first claim panics, as a bug in the claim path would.
    struct PanicOnceQueue {
        inner: MemoryJobQueue,
        panicked: AtomicBool,
    }

    #[async_trait]
    impl JobQueue for PanicOnceQueue {
        async fn enqueue(&self, job: &SummarizeJob) -> StoreResult<()> {
            self.inner.enqueue(job).await
        }

        async fn enqueue_delayed(&self, job: &SummarizeJob, delay: Duration) -> StoreResult<()> {
            self.inner.enqueue_delayed(job, delay).await
        }

        async fn claim(&self, worker_id: &str) -> StoreResult<Option<ClaimedJob>> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("claim bug");
            }
            self.inner.claim(worker_id).await
        }

        async fn ack(&self, worker_id: &str, claimed: &ClaimedJob) -> StoreResult<()> {
            self.inner.ack(worker_id, claimed).await
        }

        async fn recover(&self, worker_id: &str) -> StoreResult<usize> {
            self.inner.recover(worker_id).await
        }

        async fn heartbeat(&self, worker_id: &str, lease: Duration) -> StoreResult<()> {
            self.inner.heartbeat(worker_id, lease).await
        }

        async fn retire(&self, worker_id: &str) -> StoreResult<()> {
            self.inner.retire(worker_id).await
        }

        async fn reclaim_expired(&self) -> StoreResult<usize> {
            self.inner.reclaim_expired().await
        }

        async fn depth(&self) -> StoreResult<usize> {
            self.inner.depth().await
        }
    }

    #[tokio::test]
    async fn test_pool_restarts_panicked_worker() {
        let deps = ServerDeps::new(
            Arc::new(PanicOnceQueue {
                inner: MemoryJobQueue::new(),
                panicked: AtomicBool::new(false),
            }),
            Arc::new(MemoryJobStateStore::new()),
            Arc::new(MemoryContentCache::new()),
            settings(),
        );
        let job = SummarizeJob::new("text", 50);
        submit(&deps, &job).await;

        let shutdown = CancellationToken::new();
        let pool = WorkerPool::spawn(
            deps.clone(),
            ScriptedHandler::new(vec![AttemptOutcome::Success {
                result: "short".into(),
            }]),
            "restart-pool",
            1,
            fast_config("unused"),
            shutdown.clone(),
        );

        wait_for(&deps, &job, StateKind::Success).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), pool.join())
            .await
            .expect("pool should stop");
    }

    #[tokio::test]
    async fn test_pool_stops_on_shutdown() {
        let deps = ServerDeps::in_memory(settings());
        let shutdown = CancellationToken::new();
        let pool = WorkerPool::spawn(
            deps,
            ScriptedHandler::new(vec![]),
            "test-pool",
            3,
            fast_config("unused"),
            shutdown.clone(),
        );
        assert_eq!(pool.size(), 3);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), pool.join())
            .await
            .expect("pool should stop");
    }
}
