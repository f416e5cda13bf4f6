//! Configuration for rank fusion.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HybridOptError, Result};

/// How the orchestrator combines retrieval strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMode {
    /// A single fan-out at the resolved alpha.
    #[default]
    None,
    /// Multi-strategy search combined with Reciprocal Rank Fusion.
    Rrf,
}

impl FusionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionMode::None => "none",
            FusionMode::Rrf => "rrf",
        }
    }
}

impl fmt::Display for FusionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FusionMode {
    type Err = HybridOptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(FusionMode::None),
            "rrf" => Ok(FusionMode::Rrf),
            other => Err(HybridOptError::invalid_argument(format!(
                "Unknown fusion mode: {other}"
            ))),
        }
    }
}

/// A named alpha used by the multi-strategy flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaPreset {
    pub name: String,
    pub alpha: f32,
}

impl AlphaPreset {
    pub fn new<S: Into<String>>(name: S, alpha: f32) -> Self {
        Self {
            name: name.into(),
            alpha,
        }
    }
}

/// Configuration for Reciprocal Rank Fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Rank smoothing constant.
    pub k: u32,

    /// Alphas searched by the multi-strategy flow, in fusion order.
    pub presets: Vec<AlphaPreset>,

    /// Each strategy fetches `limit * candidate_multiplier` results.
    pub candidate_multiplier: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            k: 60,
            presets: vec![
                AlphaPreset::new("balanced", 0.5),
                AlphaPreset::new("vector_heavy", 0.8),
                AlphaPreset::new("keyword_heavy", 0.2),
            ],
            candidate_multiplier: 3,
        }
    }
}

impl FusionConfig {
    pub fn with_k(mut self, k: u32) -> Self {
        self.k = k;
        self
    }

    pub fn with_presets(mut self, presets: Vec<AlphaPreset>) -> Self {
        self.presets = presets;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.presets.is_empty() {
            return Err(HybridOptError::config(
                "at least one alpha preset is required",
            ));
        }
        if let Some(preset) = self
            .presets
            .iter()
            .find(|p| !(0.0..=1.0).contains(&p.alpha))
        {
            return Err(HybridOptError::config(format!(
                "preset '{}' alpha must be within [0, 1], got {}",
                preset.name, preset.alpha
            )));
        }
        if self.candidate_multiplier == 0 {
            return Err(HybridOptError::config(
                "candidate_multiplier must be greater than 0",
            ));
        }
        Ok(())
    }
}
