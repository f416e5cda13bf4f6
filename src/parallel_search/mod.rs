//! Parallel search across vector store shards.
//!
//! This module provides functionality to:
//! - Fan a query vector out to every shard with bounded concurrency
//! - Isolate shard failures and timeouts
//! - Merge shard results with first-seen deduplication
//! - Race a primary search against a fallback
//! - Monitor performance metrics

pub mod config;
pub mod executor;
pub mod metrics;
pub mod search_task;
pub mod store;
pub mod types;

pub use config::{ParallelSearchConfig, shard_limit};
pub use executor::{ParallelSearchExecutor, merge_shard_results};
pub use metrics::{SearchMetrics, SearchMetricsCollector, Timer};
pub use search_task::{ShardOutcome, ShardTask, TaskStatus};
pub use store::VectorStore;
pub use types::{SearchParams, SearchProvenance, SearchResult};
