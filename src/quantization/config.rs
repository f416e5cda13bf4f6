//! Configuration for vector quantization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HybridOptError, Result};

/// Quantization methods for compressing vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuantizationMethod {
    /// Per-dimension linear quantization.
    #[default]
    Scalar,
    /// Per-subspace k-means codebooks.
    Product,
}

impl fmt::Display for QuantizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantizationMethod::Scalar => f.write_str("scalar"),
            QuantizationMethod::Product => f.write_str("product"),
        }
    }
}

impl FromStr for QuantizationMethod {
    type Err = HybridOptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "scalar" => Ok(QuantizationMethod::Scalar),
            "product" | "pq" => Ok(QuantizationMethod::Product),
            other => Err(HybridOptError::invalid_argument(format!(
                "Unknown quantization method: {other}"
            ))),
        }
    }
}

/// Configuration for [`VectorQuantizer`](super::VectorQuantizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizerConfig {
    pub method: QuantizationMethod,

    /// Number of contiguous slices for product quantization.
    pub n_subspaces: usize,

    /// Bits per code. Scalar codes have `2^bits` levels per dimension,
    /// product codebooks up to `2^bits` centroids per subspace.
    pub bits: u8,

    /// Explicit centroid count per subspace. When unset, the count is
    /// `min(2^bits, n_vectors)`.
    pub n_centroids: Option<usize>,

    /// Lloyd iterations per subspace.
    pub max_iterations: usize,

    /// Mean centroid movement below which k-means stops early.
    pub tolerance: f32,

    /// Seed for k-means++ initialization.
    pub seed: u64,
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self {
            method: QuantizationMethod::Scalar,
            n_subspaces: 8,
            bits: 8,
            n_centroids: None,
            max_iterations: 25,
            tolerance: 1e-6,
            seed: 42,
        }
    }
}

impl QuantizerConfig {
    pub fn scalar(bits: u8) -> Self {
        Self {
            bits,
            ..Default::default()
        }
    }

    pub fn product(n_subspaces: usize, bits: u8) -> Self {
        Self {
            method: QuantizationMethod::Product,
            n_subspaces,
            bits,
            ..Default::default()
        }
    }

    pub fn with_n_centroids(mut self, n_centroids: usize) -> Self {
        self.n_centroids = Some(n_centroids);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of distinct codes, `2^bits`.
    pub fn levels(&self) -> usize {
        1usize << self.bits
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(1..=8).contains(&self.bits) {
            return Err(HybridOptError::config(format!(
                "bits must be within 1..=8, got {}",
                self.bits
            )));
        }
        if self.n_subspaces == 0 {
            return Err(HybridOptError::config(
                "n_subspaces must be greater than 0",
            ));
        }
        if self.max_iterations == 0 {
            return Err(HybridOptError::config(
                "max_iterations must be greater than 0",
            ));
        }
        match self.n_centroids {
            Some(0) => Err(HybridOptError::config(
                "n_centroids must be greater than 0",
            )),
            Some(n) if n > self.levels() => Err(HybridOptError::config(format!(
                "n_centroids {} does not fit in {} bits",
                n, self.bits
            ))),
            _ => Ok(()),
        }
    }
}
