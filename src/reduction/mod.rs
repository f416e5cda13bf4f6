//! Dimensionality reduction for embeddings.

pub mod config;
pub mod optimizer;
pub mod pca;
pub mod reducer;

pub use config::{ReducerConfig, ReductionMethod};
pub use optimizer::{VectorOptimizer, l2_normalize, normalize_vectors};
pub use pca::Pca;
pub use reducer::DimensionalityReducer;
