//! Configuration for dimensionality reduction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HybridOptError, Result};

/// Below this many samples `Auto` always uses PCA.
pub const SMALL_SAMPLE_LIMIT: usize = 200;

/// At or above this many samples `Auto` uses PCA for speed.
pub const LARGE_SAMPLE_LIMIT: usize = 10_000;

/// Reduction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReductionMethod {
    /// Pick a method from the number of samples.
    #[default]
    Auto,
    /// Principal component analysis.
    Pca,
}

impl fmt::Display for ReductionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReductionMethod::Auto => f.write_str("auto"),
            ReductionMethod::Pca => f.write_str("pca"),
        }
    }
}

impl FromStr for ReductionMethod {
    type Err = HybridOptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ReductionMethod::Auto),
            "pca" => Ok(ReductionMethod::Pca),
            other => Err(HybridOptError::invalid_argument(format!(
                "Unknown reduction method: {other}"
            ))),
        }
    }
}

/// Configuration for [`DimensionalityReducer`](super::DimensionalityReducer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducerConfig {
    pub method: ReductionMethod,

    /// Requested output dimension, capped at `input_dim - 1` when fitting.
    pub target_dim: usize,

    /// Fewer samples than this and `fit` fails.
    pub min_samples: usize,

    /// Power iterations per component.
    pub max_iterations: usize,

    /// Convergence threshold for power iteration.
    pub tolerance: f64,

    /// Seed for power iteration start vectors.
    pub seed: u64,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            method: ReductionMethod::Auto,
            target_dim: 128,
            min_samples: 50,
            max_iterations: 200,
            tolerance: 1e-9,
            seed: 42,
        }
    }
}

impl ReducerConfig {
    pub fn new(target_dim: usize) -> Self {
        Self {
            target_dim,
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: ReductionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.target_dim == 0 {
            return Err(HybridOptError::config(
                "target_dim must be greater than 0",
            ));
        }
        if self.max_iterations == 0 {
            return Err(HybridOptError::config(
                "max_iterations must be greater than 0",
            ));
        }
        Ok(())
    }
}
