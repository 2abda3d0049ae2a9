use serde::Deserialize;

use crate::kernel::jobs::{SummarizeJob, DEFAULT_MAX_LENGTH};

/// Body of `POST /api/v1/summarize`.
///
/// `max_length` is accepted as a signed integer so out-of-range values are
/// reported by [`SummarizeRequest::into_job`] rather than by the JSON decoder.
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
    #[serde(default = "default_max_length")]
    pub max_length: i64,
}

fn default_max_length() -> i64 {
    i64::from(DEFAULT_MAX_LENGTH)
}

impl SummarizeRequest {
    pub fn new(text: impl Into<String>, max_length: i64) -> Self {
        Self {
            text: text.into(),
            max_length,
        }
    }

    /// Validate and turn the request into a job with a fresh identifier.
    pub fn into_job(self) -> Result<SummarizeJob, String> {
        if self.text.trim().is_empty() {
            return Err("text must not be empty".to_string());
        }
        if self.max_length <= 0 {
            return Err("max_length must be a positive integer".to_string());
        }
        let max_length = u32::try_from(self.max_length)
            .map_err(|_| format!("max_length must be at most {}", u32::MAX))?;
        Ok(SummarizeJob::new(self.text, max_length))
    }
}
