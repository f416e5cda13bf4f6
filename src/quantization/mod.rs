//! Vector quantization for memory-efficient embedding storage.
//!
//! Two lossy methods are provided:
//! - Scalar quantization maps each dimension linearly onto `2^bits` levels
//!   using per-dimension bounds from the training set.
//! - Product quantization splits vectors into contiguous subspaces and
//!   replaces each slice with the index of its nearest k-means centroid.
//!
//! An unfitted quantizer passes vectors through unchanged.

pub mod config;
pub mod kmeans;
pub mod quantizer;

pub use config::{QuantizationMethod, QuantizerConfig};
pub use quantizer::{QuantizedCodes, QuantizerState, VectorQuantizer, mean_reconstruction_error};
