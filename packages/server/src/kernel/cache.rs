//! Content cache: fingerprint → previously computed summary, with per-entry TTL.
//!
//! Keys are computed by callers (see `common::utils::summary_cache_key`).
//! There is no eviction beyond TTL expiry. Backend failures are reported as
//! [`StoreError`], never as a miss.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::error::{StoreError, StoreResult};
use super::redis::RedisConnection;

#[async_trait]
pub trait ContentCache: Send + Sync {
    /// Look up a cached value. `Ok(None)` means a genuine miss.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store a value, replacing any previous entry for the key.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Remove an entry. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

// =============================================================================
// Redis
// =============================================================================

pub struct RedisContentCache {
    redis: RedisConnection,
}

impl RedisContentCache {
    pub fn new(redis: RedisConnection) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl ContentCache for RedisContentCache {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.redis
            .run_command("cache_get", || {
                let mut cmd = redis::cmd("GET");
                cmd.arg(key);
                cmd
            })
            .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let ttl_ms = ttl_millis(ttl);
        self.redis
            .run_command::<(), _>("cache_set", || {
                let mut cmd = redis::cmd("SET");
                cmd.arg(key).arg(value).arg("PX").arg(ttl_ms);
                cmd
            })
            .await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.redis
            .run_command::<(), _>("cache_delete", || {
                let mut cmd = redis::cmd("DEL");
                cmd.arg(key);
                cmd
            })
            .await
    }
}

/// TTL in whole milliseconds, at least 1 (Redis rejects a zero expiry).
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

// =============================================================================
// In-memory
// =============================================================================

/// Process-local cache used by tests and single-process setups.
#[derive(Default)]
pub struct MemoryContentCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    unavailable: Mutex<bool>,
}

impl MemoryContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap_or_else(|e| e.into_inner()) = unavailable;
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> StoreResult<()> {
        if *self.unavailable.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::Unavailable("memory cache marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentCache for MemoryContentCache {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_available()?;
        let mut entries = self.lock();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.check_available()?;
        self.lock()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_available()?;
        self.lock().remove(key);
        Ok(())
    }
}
