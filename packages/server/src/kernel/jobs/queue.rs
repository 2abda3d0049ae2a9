//! Durable FIFO hand-off of job descriptions from the API process to workers.
//!
//! Delivery is at-least-once. A claimed job sits on its worker's processing
//! list until acknowledged; a worker that restarts under the same id calls
//! [`JobQueue::recover`] to hand its unacknowledged jobs back to the queue.
//! Running workers also hold a lease renewed by [`JobQueue::heartbeat`]; the
//! processing list of a worker whose lease lapsed is handed back by
//! [`JobQueue::reclaim_expired`], whichever worker runs the sweep.
//! Delayed entries (retries) become claimable once their delay has elapsed.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;
use tracing::{error, info};

use super::job::SummarizeJob;
use crate::kernel::error::{StoreError, StoreResult};
use crate::kernel::redis::RedisConnection;

const PENDING_KEY: &str = "summarizer:queue:pending";
const DELAYED_KEY: &str = "summarizer:queue:delayed";
const PROCESSING_KEY_PREFIX: &str = "summarizer:queue:processing";
const DEAD_KEY: &str = "summarizer:queue:dead";
const WORKERS_KEY: &str = "summarizer:queue:workers";

/// Upper bound on delayed entries promoted per claim.
const PROMOTE_BATCH: usize = 100;

/// A job taken off the queue by one worker.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub job: SummarizeJob,
    /// Opaque handle used to acknowledge this delivery
    pub receipt: String,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a job to the tail of the queue.
    async fn enqueue(&self, job: &SummarizeJob) -> StoreResult<()>;

    /// Make a job claimable after `delay`.
    async fn enqueue_delayed(&self, job: &SummarizeJob, delay: Duration) -> StoreResult<()>;

    /// Take the oldest ready job, if any, onto `worker_id`'s processing list.
    async fn claim(&self, worker_id: &str) -> StoreResult<Option<ClaimedJob>>;

    /// Drop a claimed job from the processing list.
    async fn ack(&self, worker_id: &str, claimed: &ClaimedJob) -> StoreResult<()>;

    /// Return `worker_id`'s unacknowledged jobs to the queue. Returns how many moved.
    async fn recover(&self, worker_id: &str) -> StoreResult<usize>;

    /// Register or extend `worker_id`'s lease for another `lease`.
    async fn heartbeat(&self, worker_id: &str, lease: Duration) -> StoreResult<()>;

    /// Drop `worker_id`'s lease after a clean stop.
    async fn retire(&self, worker_id: &str) -> StoreResult<()>;

    /// Return the unacknowledged jobs of every worker whose lease has lapsed.
    /// Returns how many moved.
    async fn reclaim_expired(&self) -> StoreResult<usize>;

    /// Jobs waiting, ready or delayed.
    async fn depth(&self) -> StoreResult<usize>;
}

fn encode(job: &SummarizeJob) -> StoreResult<String> {
    serde_json::to_string(job).map_err(|e| StoreError::Encode(e.to_string()))
}

// =============================================================================
// Redis
// =============================================================================

/// KEYS: pending, delayed, processing. ARGV: now (ms), batch.
const CLAIM: &str = r#"
local due = redis.call("ZRANGEBYSCORE", KEYS[2], "-inf", ARGV[1], "LIMIT", 0, tonumber(ARGV[2]))
for _, payload in ipairs(due) do
  redis.call("ZREM", KEYS[2], payload)
  redis.call("LPUSH", KEYS[1], payload)
end
return redis.call("RPOPLPUSH", KEYS[1], KEYS[3])
"#;

/// KEYS: processing, pending.
const RECOVER: &str = r#"
local moved = 0
local payload = redis.call("LPOP", KEYS[1])
while payload do
  redis.call("RPUSH", KEYS[2], payload)
  moved = moved + 1
  payload = redis.call("LPOP", KEYS[1])
end
return moved
"#;

/// KEYS: workers, pending. ARGV: now (ms), processing key prefix.
const RECLAIM_EXPIRED: &str = r#"
local expired = redis.call("ZRANGEBYSCORE", KEYS[1], "-inf", ARGV[1])
local moved = 0
for _, worker in ipairs(expired) do
  local processing = ARGV[2] .. ":" .. worker
  local payload = redis.call("LPOP", processing)
  while payload do
    redis.call("RPUSH", KEYS[2], payload)
    moved = moved + 1
    payload = redis.call("LPOP", processing)
  end
  redis.call("ZREM", KEYS[1], worker)
end
return moved
"#;

/// KEYS: processing, dead. ARGV: payload.
const BURY: &str = r#"
redis.call("LREM", KEYS[1], 1, ARGV[1])
redis.call("LPUSH", KEYS[2], ARGV[1])
return 1
"#;

pub struct RedisJobQueue {
    redis: RedisConnection,
}

impl RedisJobQueue {
    pub fn new(redis: RedisConnection) -> Self {
        Self { redis }
    }

    pub fn processing_key(worker_id: &str) -> String {
        format!("{}:{}", PROCESSING_KEY_PREFIX, worker_id)
    }

    /// Move an undecodable payload out of the processing list.
    async fn bury(&self, processing: &str, payload: &str) -> StoreResult<()> {
        self.redis
            .run_command::<(), _>("queue_bury", || {
                let mut cmd = redis::cmd("EVAL");
                cmd.arg(BURY)
                    .arg(2)
                    .arg(processing)
                    .arg(DEAD_KEY)
                    .arg(payload);
                cmd
            })
            .await
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: &SummarizeJob) -> StoreResult<()> {
        let payload = encode(job)?;
        self.redis
            .run_command::<(), _>("queue_enqueue", || {
                let mut cmd = redis::cmd("LPUSH");
                cmd.arg(PENDING_KEY).arg(&payload);
                cmd
            })
            .await
    }

    async fn enqueue_delayed(&self, job: &SummarizeJob, delay: Duration) -> StoreResult<()> {
        let payload = encode(job)?;
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        let ready_at = Utc::now().timestamp_millis().saturating_add(delay_ms);
        self.redis
            .run_command::<(), _>("queue_enqueue_delayed", || {
                let mut cmd = redis::cmd("ZADD");
                cmd.arg(DELAYED_KEY).arg(ready_at).arg(&payload);
                cmd
            })
            .await
    }

    async fn claim(&self, worker_id: &str) -> StoreResult<Option<ClaimedJob>> {
        let processing = Self::processing_key(worker_id);
        loop {
            let now_ms = Utc::now().timestamp_millis();
            let payload: Option<String> = self
                .redis
                .run_command("queue_claim", || {
                    let mut cmd = redis::cmd("EVAL");
                    cmd.arg(CLAIM)
                        .arg(3)
                        .arg(PENDING_KEY)
                        .arg(DELAYED_KEY)
                        .arg(&processing)
                        .arg(now_ms)
                        .arg(PROMOTE_BATCH);
                    cmd
                })
                .await?;

            let Some(payload) = payload else {
                return Ok(None);
            };

            match serde_json::from_str::<SummarizeJob>(&payload) {
                Ok(job) => {
                    return Ok(Some(ClaimedJob {
                        job,
                        receipt: payload,
                    }))
                }
                Err(e) => {
                    error!(worker_id, error = %e, "undecodable job payload moved to dead list");
                    self.bury(&processing, &payload).await?;
                }
            }
        }
    }

    async fn ack(&self, worker_id: &str, claimed: &ClaimedJob) -> StoreResult<()> {
        let processing = Self::processing_key(worker_id);
        self.redis
            .run_command::<(), _>("queue_ack", || {
                let mut cmd = redis::cmd("LREM");
                cmd.arg(&processing).arg(1).arg(&claimed.receipt);
                cmd
            })
            .await
    }

    async fn recover(&self, worker_id: &str) -> StoreResult<usize> {
        let processing = Self::processing_key(worker_id);
        let moved: usize = self
            .redis
            .run_command("queue_recover", || {
                let mut cmd = redis::cmd("EVAL");
                cmd.arg(RECOVER).arg(2).arg(&processing).arg(PENDING_KEY);
                cmd
            })
            .await?;
        if moved > 0 {
            info!(worker_id, moved, "recovered unacknowledged jobs");
        }
        Ok(moved)
    }

    async fn heartbeat(&self, worker_id: &str, lease: Duration) -> StoreResult<()> {
        let lease_ms = i64::try_from(lease.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp_millis().saturating_add(lease_ms);
        self.redis
            .run_command::<(), _>("queue_heartbeat", || {
                let mut cmd = redis::cmd("ZADD");
                cmd.arg(WORKERS_KEY).arg(expires_at).arg(worker_id);
                cmd
            })
            .await
    }

    async fn retire(&self, worker_id: &str) -> StoreResult<()> {
        self.redis
            .run_command::<(), _>("queue_retire", || {
                let mut cmd = redis::cmd("ZREM");
                cmd.arg(WORKERS_KEY).arg(worker_id);
                cmd
            })
            .await
    }

    async fn reclaim_expired(&self) -> StoreResult<usize> {
        let now_ms = Utc::now().timestamp_millis();
        let moved: usize = self
            .redis
            .run_command("queue_reclaim_expired", || {
                let mut cmd = redis::cmd("EVAL");
                cmd.arg(RECLAIM_EXPIRED)
                    .arg(2)
                    .arg(WORKERS_KEY)
                    .arg(PENDING_KEY)
                    .arg(now_ms)
                    .arg(PROCESSING_KEY_PREFIX);
                cmd
            })
            .await?;
        if moved > 0 {
            info!(moved, "reclaimed jobs from workers with lapsed leases");
        }
        Ok(moved)
    }

    async fn depth(&self) -> StoreResult<usize> {
        let (pending, delayed): (usize, usize) = self
            .redis
            .run_command("queue_depth", || {
                let mut cmd = redis::cmd("EVAL");
                cmd.arg(r#"return {redis.call("LLEN", KEYS[1]), redis.call("ZCARD", KEYS[2])}"#)
                    .arg(2)
                    .arg(PENDING_KEY)
                    .arg(DELAYED_KEY);
                cmd
            })
            .await?;
        Ok(pending + delayed)
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Longest lease the in-memory queue will track.
const MAX_LEASE: Duration = Duration::from_secs(86_400);

#[derive(Default)]
struct MemoryQueueState {
    pending: VecDeque<SummarizeJob>,
    delayed: Vec<(Instant, SummarizeJob)>,
    processing: HashMap<String, Vec<ClaimedJob>>,
    leases: HashMap<String, Instant>,
    next_receipt: u64,
    unavailable: bool,
}

impl MemoryQueueState {
    fn promote_due(&mut self) {
        let now = Instant::now();
        let mut due: Vec<(Instant, SummarizeJob)> = Vec::new();
        self.delayed.retain(|(ready_at, job)| {
            if *ready_at <= now {
                due.push((*ready_at, job.clone()));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(ready_at, _)| *ready_at);
        self.pending.extend(due.into_iter().map(|(_, job)| job));
    }

    fn requeue_processing(&mut self, worker_id: &str) -> usize {
        let orphaned = self.processing.remove(worker_id).unwrap_or_default();
        let moved = orphaned.len();
        for claimed in orphaned.into_iter().rev() {
            self.pending.push_front(claimed.job);
        }
        moved
    }
}

/// Process-local queue used by tests and single-process setups.
#[derive(Default)]
pub struct MemoryJobQueue {
    state: Mutex<MemoryQueueState>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Jobs claimed by `worker_id` and not yet acknowledged.
    pub fn in_flight(&self, worker_id: &str) -> usize {
        self.lock()
            .processing
            .get(worker_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryQueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn available(&self) -> StoreResult<std::sync::MutexGuard<'_, MemoryQueueState>> {
        let state = self.lock();
        if state.unavailable {
            return Err(StoreError::Unavailable("memory queue marked unavailable".into()));
        }
        Ok(state)
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: &SummarizeJob) -> StoreResult<()> {
        self.available()?.pending.push_back(job.clone());
        Ok(())
    }

    async fn enqueue_delayed(&self, job: &SummarizeJob, delay: Duration) -> StoreResult<()> {
        self.available()?
            .delayed
            .push((Instant::now() + delay, job.clone()));
        Ok(())
    }

    async fn claim(&self, worker_id: &str) -> StoreResult<Option<ClaimedJob>> {
        let mut state = self.available()?;
        state.promote_due();
        let Some(job) = state.pending.pop_front() else {
            return Ok(None);
        };
        state.next_receipt += 1;
        let claimed = ClaimedJob {
            job,
            receipt: state.next_receipt.to_string(),
        };
        state
            .processing
            .entry(worker_id.to_string())
            .or_default()
            .push(claimed.clone());
        Ok(Some(claimed))
    }

    async fn ack(&self, worker_id: &str, claimed: &ClaimedJob) -> StoreResult<()> {
        let mut state = self.available()?;
        if let Some(in_flight) = state.processing.get_mut(worker_id) {
            in_flight.retain(|c| c.receipt != claimed.receipt);
        }
        Ok(())
    }

    async fn recover(&self, worker_id: &str) -> StoreResult<usize> {
        Ok(self.available()?.requeue_processing(worker_id))
    }

    async fn heartbeat(&self, worker_id: &str, lease: Duration) -> StoreResult<()> {
        let mut state = self.available()?;
        let expires_at = Instant::now() + lease.min(MAX_LEASE);
        state.leases.insert(worker_id.to_string(), expires_at);
        Ok(())
    }

    async fn retire(&self, worker_id: &str) -> StoreResult<()> {
        self.available()?.leases.remove(worker_id);
        Ok(())
    }

    async fn reclaim_expired(&self) -> StoreResult<usize> {
        let mut state = self.available()?;
        let now = Instant::now();
        let expired: Vec<String> = state
            .leases
            .iter()
            .filter(|(_, expires_at)| **expires_at <= now)
            .map(|(worker_id, _)| worker_id.clone())
            .collect();
        let mut moved = 0;
        for worker_id in expired {
            state.leases.remove(&worker_id);
            moved += state.requeue_processing(&worker_id);
        }
        Ok(moved)
    }

    async fn depth(&self) -> StoreResult<usize> {
        let state = self.available()?;
        Ok(state.pending.len() + state.delayed.len())
    }
}
