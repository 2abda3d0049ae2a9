//! Publishes one job's state transitions, validated against the lifecycle table.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::job::{JobRecord, JobState, SummarizeJob};
use super::job_store::{JobStateStore, PutOutcome};
use crate::kernel::error::StoreResult;

/// Holds the last published record for a job and writes each transition as a whole record.
pub struct JobReporter {
    store: Arc<dyn JobStateStore>,
    record: JobRecord,
    ttl: Duration,
}

impl JobReporter {
    /// Load the job's record, starting from `PENDING` if none was published.
    pub async fn load(
        store: Arc<dyn JobStateStore>,
        job: &SummarizeJob,
        ttl: Duration,
    ) -> StoreResult<Self> {
        let record = match store.get(&job.job_id).await? {
            Some(record) => record,
            None => JobRecord::pending(job),
        };
        Ok(Self { store, record, ttl })
    }

    pub fn state(&self) -> &JobState {
        &self.record.state
    }

    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    /// Publish `next` if the lifecycle allows it. Returns whether it was written.
    pub async fn transition(&mut self, next: JobState) -> StoreResult<bool> {
        let from = self.record.state.kind();
        let to = next.kind();
        if !from.can_transition_to(to) {
            warn!(
                job_id = %self.record.job_id,
                from = %from,
                to = %to,
                "rejected illegal state transition"
            );
            return Ok(false);
        }
        self.publish(next).await
    }

    /// Mark attempt `attempt` as started.
    ///
    /// A record still in `STARTED` or `PROGRESS` belongs to a worker that died
    /// mid-attempt; the redelivered attempt takes it over.
    pub async fn begin_attempt(&mut self, attempt: u32) -> StoreResult<bool> {
        let next = JobState::Started { attempt };
        match self.record.state {
            JobState::Started { .. } | JobState::Progress { .. } => {
                warn!(
                    job_id = %self.record.job_id,
                    attempt,
                    state = %self.record.state.kind(),
                    "taking over attempt from an interrupted worker"
                );
                self.publish(next).await
            }
            _ => self.transition(next).await,
        }
    }

    pub async fn progress(&mut self, message: impl Into<String>) -> StoreResult<bool> {
        self.transition(JobState::Progress {
            message: message.into(),
        })
        .await
    }

    async fn publish(&mut self, next: JobState) -> StoreResult<bool> {
        let updated = self.record.with_state(next);
        match self.store.put(&updated, self.ttl).await? {
            PutOutcome::Written => {
                debug!(
                    job_id = %updated.job_id,
                    state = %updated.state.kind(),
                    "published job state"
                );
                self.record = updated;
                Ok(true)
            }
            PutOutcome::TerminalLocked => {
                warn!(
                    job_id = %updated.job_id,
                    state = %updated.state.kind(),
                    "job already terminal; transition dropped"
                );
                if let Some(current) = self.store.get(&updated.job_id).await? {
                    self.record = current;
                }
                Ok(false)
            }
        }
    }
}
