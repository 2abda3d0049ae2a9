//! Server dependencies shared by the gateway, the query service and workers
//!
//! Every store is held behind its trait so tests can swap in the in-memory
//! implementations. The completion provider is not part of this bundle; only
//! worker processes construct one.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, RetrySettings};
use crate::kernel::cache::{ContentCache, MemoryContentCache, RedisContentCache};
use crate::kernel::jobs::{
    JobQueue, JobStateStore, MemoryJobQueue, MemoryJobStateStore, RedisJobQueue,
    RedisJobStateStore,
};
use crate::kernel::redis::RedisConnection;

// =============================================================================
// JobSettings
// =============================================================================

/// Retention and retry knobs that travel with the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSettings {
    /// Retention window for job state records
    pub result_ttl: Duration,
    pub cache_ttl: Duration,
    pub retry: RetrySettings,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            result_ttl: Duration::from_secs(3600),
            cache_ttl: Duration::from_secs(3600),
            retry: RetrySettings::default(),
        }
    }
}

impl From<&Config> for JobSettings {
    fn from(config: &Config) -> Self {
        Self {
            result_ttl: config.result_ttl,
            cache_ttl: config.cache_ttl,
            retry: config.retry,
        }
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

#[derive(Clone)]
pub struct ServerDeps {
    pub queue: Arc<dyn JobQueue>,
    pub job_store: Arc<dyn JobStateStore>,
    pub cache: Arc<dyn ContentCache>,
    /// Backing connection, when there is one (health checks ping it)
    pub redis: Option<RedisConnection>,
    pub settings: JobSettings,
}

impl ServerDeps {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        job_store: Arc<dyn JobStateStore>,
        cache: Arc<dyn ContentCache>,
        settings: JobSettings,
    ) -> Self {
        Self {
            queue,
            job_store,
            cache,
            redis: None,
            settings,
        }
    }

    /// All three stores on one shared Redis connection.
    pub fn redis(redis: RedisConnection, settings: JobSettings) -> Self {
        Self {
            queue: Arc::new(RedisJobQueue::new(redis.clone())),
            job_store: Arc::new(RedisJobStateStore::new(redis.clone())),
            cache: Arc::new(RedisContentCache::new(redis.clone())),
            redis: Some(redis),
            settings,
        }
    }

    /// Process-local stores, for tests and single-process runs.
    pub fn in_memory(settings: JobSettings) -> Self {
        Self::new(
            Arc::new(MemoryJobQueue::new()),
            Arc::new(MemoryJobStateStore::new()),
            Arc::new(MemoryContentCache::new()),
            settings,
        )
    }
}
