// Summarizer - API Core
//
// This crate provides the asynchronous summarization job service: an HTTP
// gateway that accepts texts, a Redis-backed job queue and state store, and the
// worker pool that produces summaries through an external completion provider.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
