//! Kernel module - server infrastructure and dependencies.

pub mod ai;
pub mod cache;
pub mod deps;
pub mod error;
pub mod jobs;
pub mod redis;
pub mod test_dependencies;
pub mod traits;

pub use ai::OpenAIProvider;
pub use cache::{ContentCache, MemoryContentCache, RedisContentCache};
pub use deps::{JobSettings, ServerDeps};
pub use error::{StoreError, StoreResult};
pub use redis::RedisConnection;
pub use test_dependencies::{CompletionCall, MockCompletionProvider};
pub use traits::*;
