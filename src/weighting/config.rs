//! Configuration for adaptive weighting.

use serde::{Deserialize, Serialize};

use crate::error::{HybridOptError, Result};

/// Relative influence of each query feature on the final alpha.
///
/// These are plain configuration so that an external tuner can adjust them
/// from relevance feedback; this crate does not learn them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeights {
    pub length: f32,
    pub specificity: f32,
    pub structure: f32,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            length: 0.3,
            specificity: 0.4,
            structure: 0.3,
        }
    }
}

/// Configuration for [`AdaptiveWeighting`](super::AdaptiveWeighting).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightingConfig {
    /// Lowest alpha ever produced (keyword heavy).
    pub min_alpha: f32,

    /// Highest alpha ever produced (vector heavy).
    pub max_alpha: f32,

    /// Feature weights. Must sum to 1.0.
    pub weights: FeatureWeights,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            min_alpha: 0.2,
            max_alpha: 0.95,
            weights: FeatureWeights::default(),
        }
    }
}

impl WeightingConfig {
    /// Set the alpha bounds.
    pub fn with_bounds(mut self, min_alpha: f32, max_alpha: f32) -> Self {
        self.min_alpha = min_alpha;
        self.max_alpha = max_alpha;
        self
    }

    /// Set the feature weights.
    pub fn with_weights(mut self, weights: FeatureWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_alpha) || !(0.0..=1.0).contains(&self.max_alpha) {
            return Err(HybridOptError::config(
                "Alpha bounds must be between 0.0 and 1.0",
            ));
        }
        if self.min_alpha > self.max_alpha {
            return Err(HybridOptError::config(format!(
                "min_alpha ({}) must not exceed max_alpha ({})",
                self.min_alpha, self.max_alpha
            )));
        }

        let w = &self.weights;
        if w.length < 0.0 || w.specificity < 0.0 || w.structure < 0.0 {
            return Err(HybridOptError::config("Feature weights must be non-negative"));
        }
        let total = w.length + w.specificity + w.structure;
        if (total - 1.0).abs() > 0.001 {
            return Err(HybridOptError::config(format!(
                "Feature weights must sum to 1.0, got {total}"
            )));
        }
        Ok(())
    }
}
