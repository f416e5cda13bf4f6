//! Rank fusion across retrieval strategies.

pub mod config;
pub mod multi_strategy;
pub mod rrf;

pub use config::{AlphaPreset, FusionConfig, FusionMode};
pub use multi_strategy::MultiStrategySearch;
pub use rrf::{FusedHit, fuse, fuse_and_rehydrate};
