//! Configuration for the hybrid search orchestrator.

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::error::{HybridOptError, Result};
use crate::fusion::FusionConfig;
use crate::parallel_search::ParallelSearchConfig;
use crate::weighting::WeightingConfig;

/// Configuration for [`HybridSearchEngine`](super::HybridSearchEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridSearchConfig {
    /// Query cache sizing and freshness.
    pub cache: CacheConfig,
    /// Alpha bounds and feature weights.
    pub weighting: WeightingConfig,
    /// Shard fan-out and fallback race.
    pub parallel_search: ParallelSearchConfig,
    /// Reciprocal Rank Fusion and alpha presets.
    pub fusion: FusionConfig,
    /// Requests run concurrently per chunk in `batch_search`.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    16
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            weighting: WeightingConfig::default(),
            parallel_search: ParallelSearchConfig::default(),
            fusion: FusionConfig::default(),
            batch_size: default_batch_size(),
        }
    }
}

impl HybridSearchConfig {
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_weighting(mut self, weighting: WeightingConfig) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_parallel_search(mut self, parallel_search: ParallelSearchConfig) -> Self {
        self.parallel_search = parallel_search;
        self
    }

    pub fn with_fusion(mut self, fusion: FusionConfig) -> Self {
        self.fusion = fusion;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.weighting.validate()?;
        self.parallel_search.validate()?;
        self.fusion.validate()?;
        if self.batch_size == 0 {
            return Err(HybridOptError::config(
                "batch_size must be greater than 0",
            ));
        }
        Ok(())
    }
}
