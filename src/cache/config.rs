//! Configuration for the query cache.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HybridOptError, Result};

/// Configuration shared by the vector store and the result store of a
/// [`QueryCache`](super::QueryCache).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries per store.
    pub max_size: usize,

    /// Maximum age of an entry before it is treated as a miss.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a new configuration.
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self { max_size, ttl }
    }

    /// Set the maximum number of entries per store.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(HybridOptError::config(
                "Cache max_size must be greater than 0",
            ));
        }
        if self.ttl.is_zero() {
            return Err(HybridOptError::config("Cache ttl must be greater than 0"));
        }
        Ok(())
    }
}
