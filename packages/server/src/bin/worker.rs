//! Summarization worker pool
//!
//! Runs `WORKER_CONCURRENCY` workers that pull jobs from the Redis queue, call
//! the completion provider and publish job state. Ctrl+C stops claiming new
//! jobs; jobs already in hand are finished first.

use std::sync::Arc;

use anyhow::{Context, Result};
use summarizer_core::domains::summarization::SummarizeHandler;
use summarizer_core::kernel::jobs::{JobWorkerConfig, WorkerPool};
use summarizer_core::kernel::{JobSettings, OpenAIProvider, RedisConnection, ServerDeps};
use summarizer_core::Config;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,summarizer_core=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Summarizer worker");

    let config = Config::from_env().context("Failed to load configuration")?;
    let api_key = config.require_openai_api_key()?;

    let mut provider = OpenAIProvider::new(api_key, config.openai_model.clone())
        .with_timeout(config.retry.provider_timeout);
    if let Some(base_url) = &config.openai_base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    tracing::info!(model = %provider.model(), "Completion provider configured");

    tracing::info!("Connecting to Redis...");
    let redis = RedisConnection::connect(&config.redis_url)
        .await
        .context("Failed to connect to Redis")?;
    tracing::info!("Redis connected");

    let deps = ServerDeps::redis(redis, JobSettings::from(&config));
    let handler = Arc::new(SummarizeHandler::new(deps.clone(), Arc::new(provider)));

    let pool_id = config
        .worker_pool_id
        .clone()
        .unwrap_or_else(|| format!("worker-{}", Uuid::new_v4()));

    let shutdown = CancellationToken::new();
    let pool = WorkerPool::spawn(
        deps,
        handler,
        &pool_id,
        config.worker_concurrency,
        JobWorkerConfig {
            worker_id: pool_id.clone(),
            poll_interval: config.worker_poll_interval,
            lease_duration: config.worker_lease,
        },
        shutdown.clone(),
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received, waiting for workers to finish");
    shutdown.cancel();
    pool.join().await;

    tracing::info!("Worker pool stopped");
    Ok(())
}
