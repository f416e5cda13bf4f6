//! Adaptive weighting between vector and keyword search.

pub mod adaptive;
pub mod config;

pub use adaptive::{AdaptiveWeighting, CorpusStats, QueryFeatures};
pub use config::{FeatureWeights, WeightingConfig};
