//! Explicitly constructed Redis handle shared by the cache, queue and job-state store.
//!
//! One `RedisConnection` is built at start-up and cloned into every component
//! that needs it. Clones share a single multiplexed connection which is
//! re-established lazily after a command fails.

use std::sync::Arc;

use anyhow::{Context, Result};
use redis::aio::MultiplexedConnection;
use redis::FromRedisValue;
use tokio::sync::Mutex;

use super::error::{StoreError, StoreResult};

#[derive(Clone)]
pub struct RedisConnection {
    client: redis::Client,
    connection: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl std::fmt::Debug for RedisConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConnection").finish_non_exhaustive()
    }
}

impl RedisConnection {
    /// Create a handle without connecting.
    pub fn open(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("invalid redis url: {}", url))?;
        Ok(Self {
            client,
            connection: Arc::new(Mutex::new(None)),
        })
    }

    /// Create a handle and verify the server answers.
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = Self::open(url)?;
        conn.ping().await.context("failed to reach redis")?;
        Ok(conn)
    }

    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::from)?;
        tracing::debug!("redis connection established");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        *self.connection.lock().await = None;
    }

    /// Run a command, reconnecting and retrying once if the first attempt fails.
    pub async fn run_command<T, F>(&self, operation: &'static str, build: F) -> StoreResult<T>
    where
        T: FromRedisValue + Send,
        F: Fn() -> redis::Cmd,
    {
        let mut last_err: Option<StoreError> = None;
        for attempt in 0..2 {
            let mut conn = match self.connection().await {
                Ok(conn) => conn,
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            };
            let result: redis::RedisResult<T> = build().query_async(&mut conn).await;
            match result {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(operation, "redis command succeeded after reconnect");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        error = %err,
                        "redis command failed; reconnecting"
                    );
                    self.reset().await;
                    last_err = Some(StoreError::from(err));
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| StoreError::Unavailable(format!("{} failed", operation))))
    }

    pub async fn ping(&self) -> StoreResult<()> {
        let pong: String = self.run_command("ping", || redis::cmd("PING")).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "unexpected PING reply: {}",
                pong
            )))
        }
    }
}
