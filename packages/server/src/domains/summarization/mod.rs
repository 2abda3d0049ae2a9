//! Summarization domain - submit text, run the summarization job, report its outcome

pub mod activities;
pub mod models;

pub use activities::{
    get_job_result, get_job_status, submit_summarization, ResultLookup, SubmitError,
    SummarizeHandler,
};
pub use models::{ResultResponse, StatusResponse, SubmitResponse, SummarizeRequest};
