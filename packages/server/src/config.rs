use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: String,
    /// Retention window for job state records
    pub result_ttl: Duration,
    /// Time-to-live for cached summaries
    pub cache_ttl: Duration,
    pub worker_concurrency: usize,
    pub worker_poll_interval: Duration,
    /// Lease a worker renews by heartbeat; a lapsed lease frees its in-flight jobs
    pub worker_lease: Duration,
    /// Prefix for worker ids; a restarted pool with the same id recovers its
    /// in-flight jobs immediately instead of waiting for their leases to lapse
    pub worker_pool_id: Option<String>,
    pub retry: RetrySettings,
}

/// Retry budget and backoff applied to recoverable provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Total provider attempts per job, including the first
    pub max_attempts: u32,
    /// Backoff used when the provider gives no retry-after hint
    pub default_delay: Duration,
    /// Wall-clock cap measured from the first attempt
    pub max_window: Duration,
    /// Hard timeout on each provider call
    pub provider_timeout: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_delay: Duration::from_secs(10),
            max_window: Duration::from_secs(600),
            provider_timeout: Duration::from_secs(60),
        }
    }
}

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let redis_url = match var("REDIS_URL") {
            Some(url) => url,
            None => {
                let host = var("REDIS_HOST").unwrap_or_else(|| "localhost".to_string());
                let port: u16 = parse_or(&var, "REDIS_PORT", 6379)?;
                let db: u32 = parse_or(&var, "REDIS_DB", 0)?;
                format!("redis://{}:{}/{}", host, port, db)
            }
        };

        let defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_attempts: parse_or(&var, "MAX_ATTEMPTS", defaults.max_attempts)?,
            default_delay: Duration::from_secs(parse_or(
                &var,
                "DEFAULT_RETRY_DELAY_SECS",
                defaults.default_delay.as_secs(),
            )?),
            max_window: Duration::from_secs(parse_or(
                &var,
                "MAX_RETRY_WINDOW_SECS",
                defaults.max_window.as_secs(),
            )?),
            provider_timeout: Duration::from_secs(parse_or(
                &var,
                "PROVIDER_TIMEOUT_SECS",
                defaults.provider_timeout.as_secs(),
            )?),
        };
        anyhow::ensure!(retry.max_attempts > 0, "MAX_ATTEMPTS must be at least 1");

        let worker_concurrency: usize = parse_or(&var, "WORKER_CONCURRENCY", 4)?;
        anyhow::ensure!(worker_concurrency > 0, "WORKER_CONCURRENCY must be at least 1");
        let worker_lease = Duration::from_secs(parse_or(&var, "WORKER_LEASE_SECS", 30)?);
        anyhow::ensure!(!worker_lease.is_zero(), "WORKER_LEASE_SECS must be at least 1");

        Ok(Self {
            redis_url,
            port: parse_or(&var, "PORT", 8000)?,
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL"),
            openai_model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            result_ttl: Duration::from_secs(parse_or(&var, "RESULT_TTL_SECS", 3600)?),
            cache_ttl: Duration::from_secs(parse_or(&var, "CACHE_TTL_SECS", 3600)?),
            worker_concurrency,
            worker_poll_interval: Duration::from_millis(parse_or(
                &var,
                "WORKER_POLL_INTERVAL_MS",
                500,
            )?),
            worker_lease,
            worker_pool_id: var("WORKER_POOL_ID"),
            retry,
        })
    }

    /// The provider credential, required by worker processes.
    pub fn require_openai_api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .context("OPENAI_API_KEY must be set")
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}
