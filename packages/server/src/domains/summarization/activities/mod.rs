//! Summarization domain activities - business logic functions
//!
//! The HTTP routes call `submit_summarization`, `get_job_status` and
//! `get_job_result`. Workers run jobs through `SummarizeHandler`.

pub mod query;
pub mod submit;
pub mod summarize;

pub use query::{get_job_result, get_job_status, ResultLookup};
pub use submit::{submit_summarization, SubmitError};
pub use summarize::{build_prompt, outcome_for, token_budget, SummarizeHandler};
