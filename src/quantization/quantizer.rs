//! Scalar and product quantization for memory-efficient vector storage.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{HybridOptError, Result};
use crate::quantization::config::{QuantizationMethod, QuantizerConfig};
use crate::quantization::kmeans::{KMeans, nearest_centroid};

/// Batches larger than this encode on the rayon pool.
const PARALLEL_THRESHOLD: usize = 1000;

/// Fitted parameters of a quantizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuantizerState {
    Scalar {
        min: Vec<f32>,
        max: Vec<f32>,
        bits: u8,
    },
    Product {
        dimension: usize,
        subspace_dim: usize,
        /// `codebooks[subspace][code]` is a centroid of length `subspace_dim`.
        codebooks: Vec<Vec<Vec<f32>>>,
    },
}

impl QuantizerState {
    pub fn dimension(&self) -> usize {
        match self {
            QuantizerState::Scalar { min, .. } => min.len(),
            QuantizerState::Product { dimension, .. } => *dimension,
        }
    }

    /// Check that the state can encode and decode without panicking.
    pub fn validate(&self) -> Result<()> {
        match self {
            QuantizerState::Scalar { min, max, bits } => {
                if !(1..=8).contains(bits) {
                    return Err(HybridOptError::invalid_argument(format!(
                        "Scalar bits must be in 1..=8, got {bits}"
                    )));
                }
                if min.is_empty() || min.len() != max.len() {
                    return Err(HybridOptError::invalid_argument(format!(
                        "Scalar bounds must be non-empty and equal length, got {} and {}",
                        min.len(),
                        max.len()
                    )));
                }
            }
            QuantizerState::Product {
                dimension,
                subspace_dim,
                codebooks,
            } => {
                if *dimension == 0 || *subspace_dim == 0 || dimension % subspace_dim != 0 {
                    return Err(HybridOptError::invalid_argument(format!(
                        "Dimension {dimension} cannot be split into subspaces of {subspace_dim}"
                    )));
                }
                let n_subspaces = dimension / subspace_dim;
                if codebooks.len() != n_subspaces {
                    return Err(HybridOptError::invalid_argument(format!(
                        "Expected {} codebooks, got {}",
                        n_subspaces,
                        codebooks.len()
                    )));
                }
                for (subspace, codebook) in codebooks.iter().enumerate() {
                    if codebook.is_empty() || codebook.len() > 256 {
                        return Err(HybridOptError::invalid_argument(format!(
                            "Codebook {} must hold 1..=256 centroids, got {}",
                            subspace,
                            codebook.len()
                        )));
                    }
                    if codebook.iter().any(|c| c.len() != *subspace_dim) {
                        return Err(HybridOptError::invalid_argument(format!(
                            "Codebook {subspace} has centroids not of length {subspace_dim}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Encoded vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuantizedCodes {
    /// Unquantized vectors, produced when the quantizer is not fitted.
    Raw(Vec<Vec<f32>>),
    /// One code per dimension.
    Scalar(Vec<Vec<u8>>),
    /// One codebook index per subspace.
    Product(Vec<Vec<u8>>),
}

impl QuantizedCodes {
    pub fn len(&self) -> usize {
        match self {
            QuantizedCodes::Raw(v) => v.len(),
            QuantizedCodes::Scalar(c) | QuantizedCodes::Product(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes occupied by the encoded payload.
    pub fn memory_size(&self) -> usize {
        match self {
            QuantizedCodes::Raw(v) => v.iter().map(|x| x.len() * 4).sum(),
            QuantizedCodes::Scalar(c) | QuantizedCodes::Product(c) => {
                c.iter().map(Vec::len).sum()
            }
        }
    }
}

/// Vector quantizer for compressing and decompressing embeddings.
///
/// `fit` is a one-off `&mut self` step; afterwards `encode` and `decode` take
/// `&self` and may be shared across threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorQuantizer {
    config: QuantizerConfig,
    state: Option<QuantizerState>,
}

impl VectorQuantizer {
    /// Create an unfitted quantizer.
    pub fn new(config: QuantizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: None,
        })
    }

    /// Restore a quantizer from previously fitted state.
    pub fn with_state(config: QuantizerConfig, state: QuantizerState) -> Result<Self> {
        config.validate()?;
        state.validate()?;
        Ok(Self {
            config,
            state: Some(state),
        })
    }

    pub fn config(&self) -> &QuantizerConfig {
        &self.config
    }

    pub fn state(&self) -> Option<&QuantizerState> {
        self.state.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Fit the quantizer, replacing any previous state.
    ///
    /// Returns `false` and leaves the quantizer unfitted when the training
    /// set cannot produce a codebook. `encode` is then the identity.
    pub fn fit(&mut self, vectors: &[Vec<f32>]) -> bool {
        self.state = None;

        let dimension = match training_dimension(vectors) {
            Some(dimension) => dimension,
            None => {
                log::warn!(
                    "Cannot fit quantizer on {} vectors: empty or ragged training set",
                    vectors.len()
                );
                return false;
            }
        };

        let state = match self.config.method {
            QuantizationMethod::Scalar => Some(self.fit_scalar(vectors, dimension)),
            QuantizationMethod::Product => self.fit_product(vectors, dimension),
        };

        match state {
            Some(state) => {
                log::info!(
                    "Fitted {} quantizer on {} vectors of dimension {}",
                    self.config.method,
                    vectors.len(),
                    dimension
                );
                self.state = Some(state);
                true
            }
            None => false,
        }
    }

    fn fit_scalar(&self, vectors: &[Vec<f32>], dimension: usize) -> QuantizerState {
        let mut min = vec![f32::INFINITY; dimension];
        let mut max = vec![f32::NEG_INFINITY; dimension];

        for vector in vectors {
            for (i, &value) in vector.iter().enumerate() {
                min[i] = min[i].min(value);
                max[i] = max[i].max(value);
            }
        }

        QuantizerState::Scalar {
            min,
            max,
            bits: self.config.bits,
        }
    }

    fn fit_product(&self, vectors: &[Vec<f32>], dimension: usize) -> Option<QuantizerState> {
        let n_subspaces = self.config.n_subspaces;
        if dimension % n_subspaces != 0 {
            log::warn!(
                "Cannot split dimension {} into {} equal subspaces",
                dimension,
                n_subspaces
            );
            return None;
        }

        let k = match self.config.n_centroids {
            Some(requested) if requested > vectors.len() => {
                log::warn!(
                    "Cannot fit {} centroids from {} vectors",
                    requested,
                    vectors.len()
                );
                return None;
            }
            Some(requested) => requested,
            None => self.config.levels().min(vectors.len()),
        };

        let subspace_dim = dimension / n_subspaces;
        let codebooks: Vec<Vec<Vec<f32>>> = (0..n_subspaces)
            .into_par_iter()
            .map(|subspace| {
                let start = subspace * subspace_dim;
                let slices: Vec<&[f32]> = vectors
                    .iter()
                    .map(|v| &v[start..start + subspace_dim])
                    .collect();
                KMeans::new(
                    k,
                    self.config.max_iterations,
                    self.config.tolerance,
                    self.config.seed.wrapping_add(subspace as u64),
                )
                .fit(&slices)
            })
            .collect();

        Some(QuantizerState::Product {
            dimension,
            subspace_dim,
            codebooks,
        })
    }

    /// Encode vectors. Returns the input as [`QuantizedCodes::Raw`] when the
    /// quantizer is not fitted.
    pub fn encode(&self, vectors: &[Vec<f32>]) -> Result<QuantizedCodes> {
        let state = match &self.state {
            Some(state) => state,
            None => return Ok(QuantizedCodes::Raw(vectors.to_vec())),
        };

        let dimension = state.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(HybridOptError::invalid_argument(format!(
                "Vector dimension mismatch: expected {}, got {}",
                dimension,
                bad.len()
            )));
        }

        let encode_one = |vector: &Vec<f32>| -> Vec<u8> {
            match state {
                QuantizerState::Scalar { min, max, bits } => {
                    scalar_encode(vector, min, max, *bits)
                }
                QuantizerState::Product {
                    subspace_dim,
                    codebooks,
                    ..
                } => product_encode(vector, *subspace_dim, codebooks),
            }
        };

        let codes: Vec<Vec<u8>> = if vectors.len() > PARALLEL_THRESHOLD {
            vectors.par_iter().map(encode_one).collect()
        } else {
            vectors.iter().map(encode_one).collect()
        };

        Ok(match state {
            QuantizerState::Scalar { .. } => QuantizedCodes::Scalar(codes),
            QuantizerState::Product { .. } => QuantizedCodes::Product(codes),
        })
    }

    /// Decode codes back into approximate vectors.
    pub fn decode(&self, codes: &QuantizedCodes) -> Result<Vec<Vec<f32>>> {
        match (codes, &self.state) {
            (QuantizedCodes::Raw(vectors), _) => Ok(vectors.clone()),
            (QuantizedCodes::Scalar(codes), Some(QuantizerState::Scalar { min, max, bits })) => {
                codes
                    .iter()
                    .map(|code| {
                        if code.len() != min.len() {
                            return Err(HybridOptError::invalid_argument(format!(
                                "Code length mismatch: expected {}, got {}",
                                min.len(),
                                code.len()
                            )));
                        }
                        Ok(scalar_decode(code, min, max, *bits))
                    })
                    .collect()
            }
            (QuantizedCodes::Product(codes), Some(QuantizerState::Product { codebooks, .. })) => {
                codes
                    .iter()
                    .map(|code| product_decode(code, codebooks))
                    .collect()
            }
            _ => Err(HybridOptError::invalid_argument(
                "Codes were not produced by this quantizer",
            )),
        }
    }

    /// Compression achieved on `original` as `(ratio, percent_saved)`.
    ///
    /// Returns `(1.0, 0.0)` when unfitted or when `original` is empty.
    pub fn memory_savings(&self, original: &[Vec<f32>]) -> (f32, f32) {
        let original_bytes: usize = original.iter().map(|v| v.len() * 4).sum();
        if original_bytes == 0 {
            return (1.0, 0.0);
        }

        let compressed_bytes = match &self.state {
            None => return (1.0, 0.0),
            Some(QuantizerState::Scalar { .. }) => original.iter().map(Vec::len).sum(),
            Some(QuantizerState::Product { codebooks, .. }) => {
                let codebook_bytes: usize = codebooks
                    .iter()
                    .flatten()
                    .map(|centroid| centroid.len() * 4)
                    .sum();
                original.len() * codebooks.len() + codebook_bytes
            }
        };

        let ratio = original_bytes as f32 / compressed_bytes.max(1) as f32;
        let percent = (1.0 - compressed_bytes as f32 / original_bytes as f32) * 100.0;
        (ratio, percent)
    }

    /// Serialize the configuration and fitted state.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Restore a quantizer written by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let quantizer: Self = bincode::deserialize(bytes)?;
        quantizer.config.validate()?;
        if let Some(state) = &quantizer.state {
            state.validate()?;
        }
        Ok(quantizer)
    }
}

/// Mean Euclidean distance between vectors and their reconstructions.
pub fn mean_reconstruction_error(original: &[Vec<f32>], reconstructed: &[Vec<f32>]) -> f32 {
    if original.is_empty() {
        return 0.0;
    }
    let total: f32 = original
        .iter()
        .zip(reconstructed)
        .map(|(a, b)| {
            a.iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt()
        })
        .sum();
    total / original.len() as f32
}

fn training_dimension(vectors: &[Vec<f32>]) -> Option<usize> {
    let dimension = vectors.first()?.len();
    if dimension == 0 || vectors.iter().any(|v| v.len() != dimension) {
        return None;
    }
    Some(dimension)
}

fn scalar_encode(vector: &[f32], min: &[f32], max: &[f32], bits: u8) -> Vec<u8> {
    let levels = ((1u32 << bits) - 1) as f32;
    vector
        .iter()
        .zip(min.iter().zip(max))
        .map(|(&value, (&lo, &hi))| {
            let range = hi - lo;
            if range <= 0.0 {
                0
            } else {
                ((value - lo) / range * levels).round().clamp(0.0, levels) as u8
            }
        })
        .collect()
}

fn scalar_decode(code: &[u8], min: &[f32], max: &[f32], bits: u8) -> Vec<f32> {
    let levels = ((1u32 << bits) - 1) as f32;
    code.iter()
        .zip(min.iter().zip(max))
        .map(|(&c, (&lo, &hi))| lo + c as f32 / levels * (hi - lo))
        .collect()
}

fn product_encode(vector: &[f32], subspace_dim: usize, codebooks: &[Vec<Vec<f32>>]) -> Vec<u8> {
    vector
        .chunks(subspace_dim)
        .zip(codebooks)
        .map(|(slice, codebook)| nearest_centroid(slice, codebook) as u8)
        .collect()
}

fn product_decode(code: &[u8], codebooks: &[Vec<Vec<f32>>]) -> Result<Vec<f32>> {
    if code.len() != codebooks.len() {
        return Err(HybridOptError::invalid_argument(format!(
            "Code length mismatch: expected {}, got {}",
            codebooks.len(),
            code.len()
        )));
    }
    let mut vector = Vec::new();
    for (&c, codebook) in code.iter().zip(codebooks) {
        let centroid = codebook.get(c as usize).ok_or_else(|| {
            HybridOptError::invalid_argument(format!("Code {c} is outside the codebook"))
        })?;
        vector.extend_from_slice(centroid);
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| (0..dim).map(|j| ((i * 7 + j * 3) % 11) as f32 / 10.0).collect())
            .collect()
    }

    #[test]
    fn test_scalar_round_trip_example() {
        let mut quantizer = VectorQuantizer::new(QuantizerConfig::scalar(8)).unwrap();
        assert!(quantizer.fit(&[vec![0.0], vec![10.0]]));

        let codes = quantizer.encode(&[vec![5.0]]).unwrap();
        assert_eq!(codes, QuantizedCodes::Scalar(vec![vec![128]]));

        let decoded = quantizer.decode(&codes).unwrap();
        assert!((decoded[0][0] - 5.02).abs() < 0.01);
        assert!((decoded[0][0] - 5.0).abs() <= 10.0 / 255.0);
    }

    #[test]
    fn test_scalar_clamps_and_handles_flat_dimensions() {
        let mut quantizer = VectorQuantizer::new(QuantizerConfig::scalar(4)).unwrap();
        assert!(quantizer.fit(&[vec![0.0, 3.0], vec![1.0, 3.0]]));

        let codes = quantizer.encode(&[vec![2.0, 3.0], vec![-1.0, 7.0]]).unwrap();
        assert_eq!(
            codes,
            QuantizedCodes::Scalar(vec![vec![15, 0], vec![0, 0]])
        );
        let decoded = quantizer.decode(&codes).unwrap();
        assert_eq!(decoded[0], vec![1.0, 3.0]);
    }

    #[test]
    fn test_scalar_error_is_bounded() {
        let vectors = grid(50, 16);
        let mut quantizer = VectorQuantizer::new(QuantizerConfig::default()).unwrap();
        assert!(quantizer.fit(&vectors));

        let decoded = quantizer
            .decode(&quantizer.encode(&vectors).unwrap())
            .unwrap();
        for (a, b) in vectors.iter().flatten().zip(decoded.iter().flatten()) {
            assert!((a - b).abs() <= 1.0 / 255.0 + 1e-6);
        }
    }

    #[test]
    fn test_product_round_trip() {
        let vectors = grid(64, 8);
        let mut quantizer = VectorQuantizer::new(QuantizerConfig::product(4, 4)).unwrap();
        assert!(quantizer.fit(&vectors));

        let codes = quantizer.encode(&vectors).unwrap();
        match &codes {
            QuantizedCodes::Product(c) => {
                assert_eq!(c.len(), 64);
                assert!(c.iter().all(|code| code.len() == 4));
                assert!(c.iter().flatten().all(|&code| code < 16));
            }
            other => panic!("unexpected codes: {other:?}"),
        }

        let decoded = quantizer.decode(&codes).unwrap();
        assert_eq!(decoded.len(), 64);
        assert!(decoded.iter().all(|v| v.len() == 8));
        assert!(mean_reconstruction_error(&vectors, &decoded) < 1.0);
    }

    #[test]
    fn test_product_caps_centroids_by_vector_count() {
        let vectors = grid(5, 4);
        let mut quantizer = VectorQuantizer::new(QuantizerConfig::product(2, 8)).unwrap();
        assert!(quantizer.fit(&vectors));
        match quantizer.state() {
            Some(QuantizerState::Product { codebooks, .. }) => {
                assert!(codebooks.iter().all(|cb| cb.len() == 5));
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn test_fit_failure_makes_encode_identity() {
        let vectors = grid(3, 4);
        let mut quantizer =
            VectorQuantizer::new(QuantizerConfig::product(2, 8).with_n_centroids(16)).unwrap();
        assert!(!quantizer.fit(&vectors));
        assert!(!quantizer.is_fitted());
        assert_eq!(
            quantizer.encode(&vectors).unwrap(),
            QuantizedCodes::Raw(vectors.clone())
        );
        assert_eq!(quantizer.memory_savings(&vectors), (1.0, 0.0));
    }

    #[test]
    fn test_fit_rejects_bad_training_sets() {
        let mut quantizer = VectorQuantizer::new(QuantizerConfig::product(3, 8)).unwrap();
        assert!(!quantizer.fit(&grid(10, 8)));
        assert!(!quantizer.fit(&[]));
        assert!(!quantizer.fit(&[vec![1.0, 2.0, 3.0], vec![1.0]]));
    }

    #[test]
    fn test_refit_replaces_state() {
        let mut quantizer = VectorQuantizer::new(QuantizerConfig::scalar(8)).unwrap();
        assert!(quantizer.fit(&[vec![0.0], vec![10.0]]));
        assert!(quantizer.fit(&[vec![0.0], vec![2.0]]));
        let decoded = quantizer
            .decode(&quantizer.encode(&[vec![2.0]]).unwrap())
            .unwrap();
        assert!((decoded[0][0] - 2.0).abs() < 1e-6);

        assert!(!quantizer.fit(&[]));
        assert!(!quantizer.is_fitted());
    }

    #[test]
    fn test_memory_savings() {
        let vectors = grid(100, 16);
        let mut scalar = VectorQuantizer::new(QuantizerConfig::scalar(8)).unwrap();
        scalar.fit(&vectors);
        let (ratio, pct) = scalar.memory_savings(&vectors);
        assert!((ratio - 4.0).abs() < 1e-6);
        assert!((pct - 75.0).abs() < 1e-4);

        let mut product = VectorQuantizer::new(QuantizerConfig::product(4, 2)).unwrap();
        product.fit(&vectors);
        // 100 * 4 code bytes + 4 subspaces * 4 centroids * 4 floats * 4 bytes
        let (ratio, _) = product.memory_savings(&vectors);
        assert!((ratio - 6400.0 / 656.0).abs() < 1e-4);
    }

    #[test]
    fn test_dimension_mismatch_and_foreign_codes() {
        let mut quantizer = VectorQuantizer::new(QuantizerConfig::scalar(8)).unwrap();
        quantizer.fit(&[vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert!(quantizer.encode(&[vec![1.0]]).is_err());
        assert!(
            quantizer
                .decode(&QuantizedCodes::Product(vec![vec![0]]))
                .is_err()
        );
    }

    #[test]
    fn test_state_persistence() {
        let vectors = grid(32, 8);
        let mut quantizer = VectorQuantizer::new(QuantizerConfig::product(2, 3)).unwrap();
        assert!(quantizer.fit(&vectors));

        let restored = VectorQuantizer::from_bytes(&quantizer.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.state(), quantizer.state());
        assert_eq!(
            restored.encode(&vectors).unwrap(),
            quantizer.encode(&vectors).unwrap()
        );

        let state = quantizer.state().cloned().unwrap();
        let rebuilt = VectorQuantizer::with_state(quantizer.config().clone(), state).unwrap();
        assert!(rebuilt.is_fitted());
    }

    #[test]
    fn test_with_state_rejects_malformed_state() {
        let product = QuantizerConfig::product(2, 8);
        let bad_product = [
            QuantizerState::Product {
                dimension: 0,
                subspace_dim: 0,
                codebooks: vec![],
            },
            QuantizerState::Product {
                dimension: 4,
                subspace_dim: 2,
                codebooks: vec![vec![vec![0.0, 0.0]]],
            },
            QuantizerState::Product {
                dimension: 4,
                subspace_dim: 2,
                codebooks: vec![vec![vec![0.0, 0.0]], vec![]],
            },
            QuantizerState::Product {
                dimension: 4,
                subspace_dim: 2,
                codebooks: vec![vec![vec![0.0, 0.0]], vec![vec![0.0]]],
            },
            QuantizerState::Product {
                dimension: 4,
                subspace_dim: 2,
                codebooks: vec![vec![vec![0.0, 0.0]; 257], vec![vec![0.0, 0.0]]],
            },
        ];
        for state in bad_product {
            assert!(
                VectorQuantizer::with_state(product.clone(), state.clone()).is_err(),
                "accepted {state:?}"
            );
        }

        let scalar = QuantizerConfig::scalar(8);
        let bad_scalar = [
            QuantizerState::Scalar {
                min: vec![0.0],
                max: vec![1.0],
                bits: 0,
            },
            QuantizerState::Scalar {
                min: vec![0.0],
                max: vec![1.0],
                bits: 9,
            },
            QuantizerState::Scalar {
                min: vec![0.0, 0.0],
                max: vec![1.0],
                bits: 8,
            },
            QuantizerState::Scalar {
                min: vec![],
                max: vec![],
                bits: 8,
            },
        ];
        for state in bad_scalar {
            assert!(
                VectorQuantizer::with_state(scalar.clone(), state.clone()).is_err(),
                "accepted {state:?}"
            );
        }

        let good = QuantizerState::Product {
            dimension: 4,
            subspace_dim: 2,
            codebooks: vec![vec![vec![0.0, 0.0]], vec![vec![1.0, 1.0]]],
        };
        let quantizer = VectorQuantizer::with_state(product, good).unwrap();
        assert_eq!(
            quantizer.encode(&[vec![0.0, 0.0, 1.0, 1.0]]).unwrap(),
            QuantizedCodes::Product(vec![vec![0, 0]])
        );
    }

    #[test]
    fn test_from_bytes_rejects_malformed_state() {
        let corrupted = VectorQuantizer {
            config: QuantizerConfig::product(2, 8),
            state: Some(QuantizerState::Product {
                dimension: 8,
                subspace_dim: 0,
                codebooks: vec![vec![vec![0.0]]; 2],
            }),
        };
        let bytes = corrupted.to_bytes().unwrap();
        assert!(VectorQuantizer::from_bytes(&bytes).is_err());

        let unfitted = VectorQuantizer::new(QuantizerConfig::product(2, 8)).unwrap();
        let restored = VectorQuantizer::from_bytes(&unfitted.to_bytes().unwrap()).unwrap();
        assert!(!restored.is_fitted());
    }
}
