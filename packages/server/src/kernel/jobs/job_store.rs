//! Job-state store: the durable, queryable record of each job's lifecycle.
//!
//! Every write replaces the whole [`JobRecord`] in one operation, so readers see
//! either the previous state or the next one, never a mix. A record that has
//! reached `SUCCESS` or `FAILURE` is never overwritten.
//!
//! The retention window starts when a record turns terminal; `PENDING` and
//! in-flight records are kept without expiry however long the backlog is.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::job::JobRecord;
use crate::kernel::cache::ttl_millis;
use crate::kernel::error::{StoreError, StoreResult};
use crate::kernel::redis::RedisConnection;

const JOB_KEY_PREFIX: &str = "summarizer:job";

/// Result of a conditional state write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    /// The stored record is terminal; nothing was written
    TerminalLocked,
}

#[async_trait]
pub trait JobStateStore: Send + Sync {
    async fn get(&self, job_id: &str) -> StoreResult<Option<JobRecord>>;

    /// Replace the record atomically unless the stored one is terminal.
    /// `ttl` is applied only when `record` itself is terminal.
    async fn put(&self, record: &JobRecord, ttl: Duration) -> StoreResult<PutOutcome>;

    async fn delete(&self, job_id: &str) -> StoreResult<()>;
}

// =============================================================================
// Redis
// =============================================================================

const PUT_UNLESS_TERMINAL: &str = r#"
local current = redis.call("GET", KEYS[1])
if current then
  local ok, decoded = pcall(cjson.decode, current)
  if ok and (decoded["state"] == "SUCCESS" or decoded["state"] == "FAILURE") then
    return 0
  end
end
if ARGV[2] == "0" then
  redis.call("SET", KEYS[1], ARGV[1])
else
  redis.call("SET", KEYS[1], ARGV[1], "PX", ARGV[2])
end
return 1
"#;

pub struct RedisJobStateStore {
    redis: RedisConnection,
}

impl RedisJobStateStore {
    pub fn new(redis: RedisConnection) -> Self {
        Self { redis }
    }

    pub fn key(job_id: &str) -> String {
        format!("{}:{}", JOB_KEY_PREFIX, job_id)
    }
}

#[async_trait]
impl JobStateStore for RedisJobStateStore {
    async fn get(&self, job_id: &str) -> StoreResult<Option<JobRecord>> {
        let key = Self::key(job_id);
        let raw: Option<String> = self
            .redis
            .run_command("job_state_get", || {
                let mut cmd = redis::cmd("GET");
                cmd.arg(&key);
                cmd
            })
            .await?;

        raw.map(|payload| {
            serde_json::from_str(&payload).map_err(|e| StoreError::corrupt(&key, e))
        })
        .transpose()
    }

    async fn put(&self, record: &JobRecord, ttl: Duration) -> StoreResult<PutOutcome> {
        let key = Self::key(&record.job_id);
        let payload =
            serde_json::to_string(record).map_err(|e| StoreError::Encode(e.to_string()))?;
        // 0 keeps the record until it turns terminal
        let ttl_ms = if record.state.is_terminal() {
            ttl_millis(ttl)
        } else {
            0
        };

        let written: i64 = self
            .redis
            .run_command("job_state_put", || {
                let mut cmd = redis::cmd("EVAL");
                cmd.arg(PUT_UNLESS_TERMINAL)
                    .arg(1)
                    .arg(&key)
                    .arg(&payload)
                    .arg(ttl_ms);
                cmd
            })
            .await?;

        Ok(if written == 1 {
            PutOutcome::Written
        } else {
            PutOutcome::TerminalLocked
        })
    }

    async fn delete(&self, job_id: &str) -> StoreResult<()> {
        let key = Self::key(job_id);
        self.redis
            .run_command::<(), _>("job_state_delete", || {
                let mut cmd = redis::cmd("DEL");
                cmd.arg(&key);
                cmd
            })
            .await
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Default)]
pub struct MemoryJobStateStore {
    records: Mutex<HashMap<String, (JobRecord, Option<Instant>)>>,
}

fn is_live(expires_at: &Option<Instant>, now: Instant) -> bool {
    !matches!(expires_at, Some(at) if *at <= now)
}

impl MemoryJobStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) records.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|(_, expires_at)| is_live(expires_at, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (JobRecord, Option<Instant>)>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl JobStateStore for MemoryJobStateStore {
    async fn get(&self, job_id: &str) -> StoreResult<Option<JobRecord>> {
        let mut records = self.lock();
        match records.get(job_id) {
            Some((record, expires_at)) if is_live(expires_at, Instant::now()) => {
                Ok(Some(record.clone()))
            }
            Some(_) => {
                records.remove(job_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, record: &JobRecord, ttl: Duration) -> StoreResult<PutOutcome> {
        let mut records = self.lock();
        let now = Instant::now();
        if let Some((current, expires_at)) = records.get(&record.job_id) {
            if is_live(expires_at, now) && current.state.is_terminal() {
                return Ok(PutOutcome::TerminalLocked);
            }
        }
        let expires_at = if record.state.is_terminal() {
            now.checked_add(ttl)
        } else {
            None
        };
        records.insert(record.job_id.clone(), (record.clone(), expires_at));
        Ok(PutOutcome::Written)
    }

    async fn delete(&self, job_id: &str) -> StoreResult<()> {
        self.lock().remove(job_id);
        Ok(())
    }
}
