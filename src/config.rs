//! Top-level configuration for every optimization component.
//!
//! Configuration is an explicit value built once at startup and handed to
//! the components that need it. It can be loaded from a JSON file; missing
//! sections take their defaults.
//!
//! ```
//! use hybridopt::config::OptimizerConfig;
//!
//! let config: OptimizerConfig =
//!     serde_json::from_str(r#"{"fusion": {"k": 30, "presets": [], "candidate_multiplier": 3}}"#)
//!         .unwrap();
//! assert_eq!(config.fusion.k, 30);
//! assert!(config.validate().is_err());
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::error::{HybridOptError, Result};
use crate::fusion::FusionConfig;
use crate::hybrid_search::HybridSearchConfig;
use crate::parallel_search::ParallelSearchConfig;
use crate::quantization::QuantizerConfig;
use crate::reduction::ReducerConfig;
use crate::weighting::WeightingConfig;

/// Configuration for the whole optimization layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub cache: CacheConfig,
    pub weighting: WeightingConfig,
    pub parallel_search: ParallelSearchConfig,
    pub fusion: FusionConfig,
    pub quantizer: QuantizerConfig,
    pub reducer: ReducerConfig,
}

impl OptimizerConfig {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            HybridOptError::config(format!("Cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as pretty JSON.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.weighting.validate()?;
        self.parallel_search.validate()?;
        self.fusion.validate()?;
        self.quantizer.validate()?;
        self.reducer.validate()?;
        Ok(())
    }

    /// The orchestrator's share of the configuration.
    pub fn hybrid_search(&self) -> HybridSearchConfig {
        HybridSearchConfig::default()
            .with_cache(self.cache.clone())
            .with_weighting(self.weighting.clone())
            .with_parallel_search(self.parallel_search.clone())
            .with_fusion(self.fusion.clone())
    }
}
