//! Job model: the queued job description, the lifecycle state machine, and the
//! record published to the job-state store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default `max_length` for a summarization request.
pub const DEFAULT_MAX_LENGTH: u32 = 150;

// ============================================================================
// Job description (queue payload)
// ============================================================================

/// What travels on the queue: everything a worker needs to run one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeJob {
    pub job_id: String,
    pub text: String,
    pub max_length: u32,
    /// 1-based attempt number this delivery represents
    #[serde(default = "first_attempt")]
    pub attempt: u32,
    /// When the first attempt began; anchors the retry window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_attempt_at: Option<DateTime<Utc>>,
}

fn first_attempt() -> u32 {
    1
}

impl SummarizeJob {
    /// New job with a fresh identifier.
    pub fn new(text: impl Into<String>, max_length: u32) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            text: text.into(),
            max_length,
            attempt: 1,
            first_attempt_at: None,
        }
    }

    /// The description for the next attempt after a recoverable failure.
    pub fn next_attempt(&self, first_attempt_at: DateTime<Utc>) -> Self {
        Self {
            attempt: self.attempt + 1,
            first_attempt_at: Some(first_attempt_at),
            ..self.clone()
        }
    }
}

// ============================================================================
// State machine
// ============================================================================

/// Lifecycle state with per-variant payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Queued, not yet picked up
    Pending,
    /// A worker has begun processing
    Started { attempt: u32 },
    /// The external call is in flight
    Progress { message: String },
    /// A recoverable failure occurred; another attempt is scheduled
    Retry {
        /// Attempts used so far
        attempt: u32,
        max_attempts: u32,
        delay_ms: u64,
        message: String,
    },
    /// Terminal: result available
    Success { result: String },
    /// Terminal: no further attempts
    Failure { error: String },
}

/// Payload-free discriminant of [`JobState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Pending,
    Started,
    Progress,
    Retry,
    Success,
    Failure,
}

impl StateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKind::Pending => "PENDING",
            StateKind::Started => "STARTED",
            StateKind::Progress => "PROGRESS",
            StateKind::Retry => "RETRY",
            StateKind::Success => "SUCCESS",
            StateKind::Failure => "FAILURE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StateKind::Success | StateKind::Failure)
    }

    /// Whether `self -> next` is a legal lifecycle transition.
    pub fn can_transition_to(&self, next: StateKind) -> bool {
        use StateKind::*;
        matches!(
            (self, next),
            (Pending, Started)
                | (Started, Progress)
                | (Started, Success)
                | (Progress, Success)
                | (Progress, Retry)
                | (Progress, Failure)
                | (Retry, Started)
                | (Retry, Failure)
        )
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JobState {
    pub fn kind(&self) -> StateKind {
        match self {
            JobState::Pending => StateKind::Pending,
            JobState::Started { .. } => StateKind::Started,
            JobState::Progress { .. } => StateKind::Progress,
            JobState::Retry { .. } => StateKind::Retry,
            JobState::Success { .. } => StateKind::Success,
            JobState::Failure { .. } => StateKind::Failure,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// Human-readable status line for polling clients.
    pub fn status_line(&self) -> String {
        match self {
            JobState::Pending => "Task is waiting to be processed.".to_string(),
            JobState::Started { .. } => "Task has started.".to_string(),
            JobState::Progress { message } => message.clone(),
            JobState::Retry { message, .. } => message.clone(),
            JobState::Success { .. } => "Task completed successfully.".to_string(),
            JobState::Failure { .. } => "Task failed.".to_string(),
        }
    }
}

// ============================================================================
// Published record
// ============================================================================

/// The whole externally visible state of one job. Always written as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    #[serde(flatten)]
    pub state: JobState,
    pub max_length: u32,
    /// Attempts begun so far
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Record for a freshly submitted job.
    pub fn pending(job: &SummarizeJob) -> Self {
        let now = Utc::now();
        Self {
            job_id: job.job_id.clone(),
            state: JobState::Pending,
            max_length: job.max_length,
            attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of this record in `state`.
    pub fn with_state(&self, state: JobState) -> Self {
        let attempts = match &state {
            JobState::Started { attempt } => (*attempt).max(self.attempts),
            _ => self.attempts,
        };
        Self {
            state,
            attempts,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
