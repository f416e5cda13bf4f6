//! Configuration for parallel shard search.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HybridOptError, Result};

/// Configuration for [`ParallelSearchExecutor`](super::ParallelSearchExecutor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelSearchConfig {
    /// Maximum number of shard searches in flight at once.
    pub max_workers: usize,

    /// Optional deadline for a single shard. A shard that misses it
    /// contributes no results.
    pub shard_timeout: Option<Duration>,

    /// How long the primary search may run before the fallback takes over.
    pub fallback_timeout: Duration,

    /// Whether to enable metrics collection.
    pub enable_metrics: bool,
}

impl Default for ParallelSearchConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            shard_timeout: None,
            fallback_timeout: Duration::from_secs(2),
            enable_metrics: true,
        }
    }
}

impl ParallelSearchConfig {
    /// Set the concurrency bound.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Set the per-shard deadline.
    pub fn with_shard_timeout(mut self, timeout: Duration) -> Self {
        self.shard_timeout = Some(timeout);
        self
    }

    /// Set the primary search timeout.
    pub fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    /// Enable or disable metrics.
    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(HybridOptError::config(
                "max_workers must be greater than 0",
            ));
        }
        if self.fallback_timeout.is_zero() {
            return Err(HybridOptError::config(
                "fallback_timeout must be greater than 0",
            ));
        }
        if matches!(self.shard_timeout, Some(t) if t.is_zero()) {
            return Err(HybridOptError::config(
                "shard_timeout must be greater than 0 when set",
            ));
        }
        Ok(())
    }
}

/// Number of candidates requested from each shard for a final `limit`.
///
/// Over-fetches so that cross-shard duplicates do not starve the merge.
pub fn shard_limit(limit: usize) -> usize {
    limit.saturating_mul(2).min(limit.saturating_add(20))
}
