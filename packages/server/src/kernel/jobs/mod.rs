//! Job infrastructure for background summarization.
//!
//! - [`JobQueue`] - durable FIFO of job descriptions (Redis or in-memory)
//! - [`JobStateStore`] - per-job state records, terminal states locked
//! - [`JobReporter`] - validated transition publishing for one job
//! - [`JobWorker`] / [`WorkerPool`] - poll, execute, publish, acknowledge
//!
//! # Architecture
//!
//! ```text
//! POST /api/v1/summarize
//!     │
//!     ├─► JobStateStore.put(PENDING)
//!     └─► JobQueue.enqueue(job)
//!
//! JobWorker
//!     │
//!     ├─► JobQueue.claim()
//!     ├─► JobHandler.run_attempt() ─► AttemptOutcome
//!     ├─► JobStateStore.put(next state)
//!     └─► JobQueue.ack() / enqueue_delayed() on retry
//! ```
//!
//! What a job does lives in the summarization domain. This module only runs it.

mod job;
mod job_store;
mod queue;
mod reporter;
mod worker;

pub use job::{JobRecord, JobState, StateKind, SummarizeJob, DEFAULT_MAX_LENGTH};
pub use job_store::{JobStateStore, MemoryJobStateStore, PutOutcome, RedisJobStateStore};
pub use queue::{ClaimedJob, JobQueue, MemoryJobQueue, RedisJobQueue};
pub use reporter::JobReporter;
pub use worker::{may_retry, AttemptOutcome, JobHandler, JobWorker, JobWorkerConfig, WorkerPool};
