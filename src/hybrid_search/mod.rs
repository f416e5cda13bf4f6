//! Hybrid search orchestration.
//!
//! This module ties the optimization layer together for a single query:
//! - Cached results and query embeddings
//! - Adaptive vector/keyword weighting from query features
//! - Bounded parallel search across vector store shards
//! - Optional multi-strategy search combined with Reciprocal Rank Fusion
//! - Optional fallback search when the primary search is slow or failing

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod types;

pub use collaborators::{CorpusStatsProvider, Embedder, FallbackSearcher, SharedCorpusStats};
pub use config::HybridSearchConfig;
pub use engine::HybridSearchEngine;
pub use types::{HybridSearchRequest, HybridSearchResponse, ResultSource};
