//! # hybridopt
//!
//! An optimization layer for hybrid (vector + keyword) retrieval.
//!
//! ## Features
//!
//! - Query embedding and result caching with TTL and least-used eviction
//! - Adaptive vector/keyword weighting from query features
//! - Bounded parallel search across vector store shards with fallback
//! - Reciprocal Rank Fusion over multiple weighting strategies
//! - Scalar and product quantization of stored vectors
//! - PCA dimensionality reduction

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fusion;
pub mod hybrid_search;
pub mod parallel_search;
pub mod quantization;
pub mod reduction;
pub mod weighting;

pub mod prelude {
    pub use crate::cache::{CacheConfig, QueryCache};
    pub use crate::config::OptimizerConfig;
    pub use crate::error::{HybridOptError, Result};
    pub use crate::fusion::{FusionConfig, FusionMode, fuse};
    pub use crate::hybrid_search::{
        CorpusStatsProvider, Embedder, FallbackSearcher, HybridSearchConfig, HybridSearchEngine,
        HybridSearchRequest, HybridSearchResponse, ResultSource, SharedCorpusStats,
    };
    pub use crate::parallel_search::{
        ParallelSearchConfig, ParallelSearchExecutor, SearchParams, SearchProvenance,
        SearchResult, VectorStore,
    };
    pub use crate::quantization::{QuantizationMethod, QuantizerConfig, VectorQuantizer};
    pub use crate::reduction::{DimensionalityReducer, ReducerConfig};
    pub use crate::weighting::{AdaptiveWeighting, CorpusStats, WeightingConfig};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
