//! Ingestion pass: optional PCA followed by L2 normalization.

use rayon::prelude::*;

use crate::error::Result;
use crate::reduction::config::ReducerConfig;
use crate::reduction::reducer::DimensionalityReducer;

/// Batches must hold more than this many vectors before PCA is fitted.
pub const MIN_VECTORS_FOR_REDUCTION: usize = 50;

/// Upper bound on the output dimension of the ingestion pass.
pub const MAX_OPTIMIZED_DIM: usize = 384;

/// Batches larger than this are normalized on the rayon pool.
const PARALLEL_THRESHOLD: usize = 100;

/// Scale `vector` to unit length. Zero vectors are left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// L2-normalize every vector in place.
pub fn normalize_vectors(vectors: &mut [Vec<f32>]) {
    if vectors.len() > PARALLEL_THRESHOLD {
        vectors.par_iter_mut().for_each(|v| l2_normalize(v));
    } else {
        for vector in vectors {
            l2_normalize(vector);
        }
    }
}

/// Prepares embeddings for storage.
///
/// The first batch with more than [`MIN_VECTORS_FOR_REDUCTION`] vectors wider
/// than the target dimension fits a PCA model. That model is then applied to
/// every later batch. All output vectors are L2-normalized.
#[derive(Debug, Clone)]
pub struct VectorOptimizer {
    reducer: DimensionalityReducer,
}

impl VectorOptimizer {
    /// Create an optimizer. `target_dim` is capped at [`MAX_OPTIMIZED_DIM`].
    pub fn new(config: ReducerConfig) -> Result<Self> {
        let config = ReducerConfig {
            target_dim: config.target_dim.min(MAX_OPTIMIZED_DIM),
            min_samples: MIN_VECTORS_FOR_REDUCTION + 1,
            ..config
        };
        Ok(Self {
            reducer: DimensionalityReducer::new(config)?,
        })
    }

    pub fn target_dim(&self) -> usize {
        self.reducer.config().target_dim
    }

    pub fn reducer(&self) -> &DimensionalityReducer {
        &self.reducer
    }

    /// Reduce (fitting on first use) and normalize a batch of vectors.
    pub fn optimize_vectors(&mut self, vectors: &[Vec<f32>]) -> Vec<Vec<f32>> {
        if vectors.is_empty() {
            return Vec::new();
        }

        let mut optimized = if self.reducer.is_fitted() {
            self.reducer.transform(vectors)
        } else if vectors.len() > MIN_VECTORS_FOR_REDUCTION
            && vectors[0].len() > self.target_dim()
            && self.reducer.fit(vectors)
        {
            self.reducer.transform(vectors)
        } else {
            vectors.to_vec()
        };

        normalize_vectors(&mut optimized);
        optimized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize, dim: usize, offset: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let t = (i + offset) as f32;
                (0..dim)
                    .map(|j| t * (j as f32 + 1.0) * 0.1 + (((i + offset) * (j + 3)) % 7) as f32)
                    .collect()
            })
            .collect()
    }

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.6, 0.8]);

        let mut zero = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0, 0.0]);

        let mut many = samples(150, 4, 1);
        normalize_vectors(&mut many);
        assert!(many.iter().all(|v| (norm(v) - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_target_dim_is_capped() {
        let optimizer = VectorOptimizer::new(ReducerConfig::new(1024)).unwrap();
        assert_eq!(optimizer.target_dim(), MAX_OPTIMIZED_DIM);
        assert!(VectorOptimizer::new(ReducerConfig::new(0)).is_err());
    }

    #[test]
    fn test_small_batch_is_only_normalized() {
        let mut optimizer = VectorOptimizer::new(ReducerConfig::new(4)).unwrap();
        let mut batch = samples(MIN_VECTORS_FOR_REDUCTION, 8, 1);
        batch.push(vec![0.0; 8]);

        let optimized = optimizer.optimize_vectors(&batch);

        assert!(!optimizer.reducer().is_fitted());
        assert_eq!(optimized.len(), batch.len());
        assert!(optimized.iter().all(|v| v.len() == 8));
        assert_eq!(optimized.last().unwrap(), &vec![0.0; 8]);
        assert!(optimized[..50].iter().all(|v| (norm(v) - 1.0).abs() < 1e-5));
        assert!(optimizer.optimize_vectors(&[]).is_empty());
    }

    #[test]
    fn test_narrow_vectors_skip_reduction() {
        let mut optimizer = VectorOptimizer::new(ReducerConfig::new(8)).unwrap();
        let optimized = optimizer.optimize_vectors(&samples(60, 8, 1));
        assert!(!optimizer.reducer().is_fitted());
        assert!(optimized.iter().all(|v| v.len() == 8));
    }

    #[test]
    fn test_large_batch_is_reduced_then_normalized() {
        let mut optimizer = VectorOptimizer::new(ReducerConfig::new(4)).unwrap();
        let optimized = optimizer.optimize_vectors(&samples(60, 8, 1));

        assert!(optimizer.reducer().is_fitted());
        assert_eq!(optimizer.reducer().output_dim(), Some(4));
        assert!(optimized.iter().all(|v| v.len() == 4));
        assert!(optimized.iter().all(|v| (norm(v) - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_fitted_model_is_reused_across_batches() {
        let mut optimizer = VectorOptimizer::new(ReducerConfig::new(4)).unwrap();
        optimizer.optimize_vectors(&samples(60, 8, 1));
        let model = optimizer.reducer().model().cloned();

        let small = samples(5, 8, 500);
        let optimized = optimizer.optimize_vectors(&small);
        assert!(optimized.iter().all(|v| v.len() == 4));

        let mut expected = optimizer.reducer().transform(&small);
        normalize_vectors(&mut expected);
        assert_eq!(optimized, expected);

        optimizer.optimize_vectors(&samples(80, 8, 1000));
        assert_eq!(optimizer.reducer().model().cloned(), model);
    }
}
