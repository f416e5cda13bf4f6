//! Dimensionality reduction with identity fallback.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reduction::config::{
    LARGE_SAMPLE_LIMIT, ReducerConfig, ReductionMethod, SMALL_SAMPLE_LIMIT,
};
use crate::reduction::pca::Pca;

/// Batches larger than this are projected on the rayon pool.
const PARALLEL_THRESHOLD: usize = 1000;

/// Reduces embedding dimensionality.
///
/// Every operation degrades to the identity instead of failing: too few
/// samples, a missing fit or a dimension mismatch all return the input
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionalityReducer {
    config: ReducerConfig,
    model: Option<Pca>,
}

impl DimensionalityReducer {
    pub fn new(config: ReducerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            model: None,
        })
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&Pca> {
        self.model.as_ref()
    }

    /// Output dimension of the fitted model.
    pub fn output_dim(&self) -> Option<usize> {
        self.model.as_ref().map(Pca::output_dim)
    }

    /// Share of variance captured by the fitted model.
    pub fn explained_variance(&self) -> Option<f32> {
        self.model.as_ref().map(Pca::explained_variance)
    }

    /// Fit using the configured `min_samples`.
    pub fn fit(&mut self, embeddings: &[Vec<f32>]) -> bool {
        self.fit_with_min_samples(embeddings, self.config.min_samples)
    }

    /// Fit the reducer, replacing any previous model.
    ///
    /// Returns `false` and leaves the reducer unfitted with fewer than
    /// `min_samples` embeddings or when the input cannot be reduced.
    pub fn fit_with_min_samples(&mut self, embeddings: &[Vec<f32>], min_samples: usize) -> bool {
        self.model = None;

        if embeddings.is_empty() || embeddings.len() < min_samples {
            log::warn!(
                "Not enough samples to fit reducer: {} < {}",
                embeddings.len(),
                min_samples
            );
            return false;
        }

        let input_dim = embeddings[0].len();
        if embeddings.iter().any(|e| e.len() != input_dim) {
            log::warn!("Cannot fit reducer on embeddings of differing dimension");
            return false;
        }
        if input_dim < 2 {
            log::warn!("Cannot reduce {}-dimensional embeddings", input_dim);
            return false;
        }

        let target_dim = self.config.target_dim.min(input_dim - 1);
        let method = self.select_method(embeddings.len());

        let pca = Pca::fit(
            embeddings,
            target_dim,
            self.config.max_iterations,
            self.config.tolerance,
            self.config.seed,
        );
        log::info!(
            "Fitted {} {} -> {} on {} samples ({:.1}% variance explained)",
            method,
            input_dim,
            target_dim,
            embeddings.len(),
            pca.explained_variance() * 100.0
        );
        self.model = Some(pca);

        true
    }

    /// Resolve the configured method for a training set of `n_samples`.
    pub fn select_method(&self, n_samples: usize) -> ReductionMethod {
        match self.config.method {
            ReductionMethod::Pca => ReductionMethod::Pca,
            ReductionMethod::Auto if n_samples < SMALL_SAMPLE_LIMIT => ReductionMethod::Pca,
            ReductionMethod::Auto if n_samples >= LARGE_SAMPLE_LIMIT => ReductionMethod::Pca,
            ReductionMethod::Auto => {
                log::info!(
                    "No neighborhood-preserving reducer available for {} samples, using PCA",
                    n_samples
                );
                ReductionMethod::Pca
            }
        }
    }

    /// Project embeddings, or return them unchanged if that is not possible.
    pub fn transform(&self, embeddings: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let model = match &self.model {
            Some(model) => model,
            None => {
                log::warn!("Reducer is not fitted, returning embeddings unchanged");
                return embeddings.to_vec();
            }
        };

        if let Some(bad) = embeddings.iter().find(|e| e.len() != model.input_dim()) {
            log::error!(
                "Embedding dimension {} does not match fitted dimension {}, returning embeddings unchanged",
                bad.len(),
                model.input_dim()
            );
            return embeddings.to_vec();
        }

        if embeddings.len() > PARALLEL_THRESHOLD {
            embeddings.par_iter().map(|e| model.project(e)).collect()
        } else {
            embeddings.iter().map(|e| model.project(e)).collect()
        }
    }

    /// Fit on `embeddings` and transform them.
    pub fn fit_transform(&mut self, embeddings: &[Vec<f32>]) -> Vec<Vec<f32>> {
        if self.fit(embeddings) {
            self.transform(embeddings)
        } else {
            embeddings.to_vec()
        }
    }

    /// Serialize the configuration and fitted model.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Restore a reducer written by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let reducer: Self = bincode::deserialize(bytes)?;
        reducer.config.validate()?;
        Ok(reducer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let t = i as f32;
                (0..dim)
                    .map(|j| {
                        if j == 0 {
                            t
                        } else {
                            t * 0.5 + ((i * (j + 3)) % 7) as f32 * 0.1
                        }
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_too_few_samples_is_identity() {
        let data = samples(10, 4);
        let mut reducer = DimensionalityReducer::new(ReducerConfig::new(2)).unwrap();

        assert!(!reducer.fit(&data));
        assert!(!reducer.is_fitted());
        assert_eq!(reducer.transform(&data), data);
        assert_eq!(reducer.fit_transform(&data), data);
    }

    #[test]
    fn test_fit_transform_reduces() {
        let data = samples(60, 6);
        let mut reducer = DimensionalityReducer::new(ReducerConfig::new(2)).unwrap();

        let reduced = reducer.fit_transform(&data);

        assert_eq!(reduced.len(), 60);
        assert!(reduced.iter().all(|r| r.len() == 2));
        assert_eq!(reducer.output_dim(), Some(2));
        assert!(reducer.explained_variance().unwrap() > 0.9);
    }

    #[test]
    fn test_target_dim_capped() {
        let data = samples(60, 3);
        let mut reducer = DimensionalityReducer::new(ReducerConfig::default()).unwrap();
        assert!(reducer.fit(&data));
        assert_eq!(reducer.output_dim(), Some(2));
    }

    #[test]
    fn test_explicit_min_samples() {
        let data = samples(10, 4);
        let mut reducer = DimensionalityReducer::new(ReducerConfig::new(2)).unwrap();
        assert!(reducer.fit_with_min_samples(&data, 5));
        assert!(reducer.is_fitted());
    }

    #[test]
    fn test_transform_dimension_mismatch_is_identity() {
        let mut reducer = DimensionalityReducer::new(ReducerConfig::new(2)).unwrap();
        assert!(reducer.fit(&samples(60, 5)));

        let other = samples(3, 7);
        assert_eq!(reducer.transform(&other), other);
    }

    #[test]
    fn test_unreducible_inputs() {
        let mut reducer =
            DimensionalityReducer::new(ReducerConfig::new(2).with_min_samples(1)).unwrap();
        assert!(!reducer.fit(&[vec![1.0], vec![2.0]]));
        assert!(!reducer.fit(&[vec![1.0, 2.0], vec![2.0]]));
        assert!(!reducer.fit(&[]));
    }

    #[test]
    fn test_method_selection() {
        let reducer = DimensionalityReducer::new(ReducerConfig::default()).unwrap();
        assert_eq!(reducer.select_method(50), ReductionMethod::Pca);
        assert_eq!(reducer.select_method(500), ReductionMethod::Pca);
        assert_eq!(reducer.select_method(20_000), ReductionMethod::Pca);
    }

    #[test]
    fn test_fit_is_deterministic_and_persists() {
        let data = samples(80, 8);
        let mut a = DimensionalityReducer::new(ReducerConfig::new(3)).unwrap();
        let mut b = DimensionalityReducer::new(ReducerConfig::new(3)).unwrap();
        assert_eq!(a.fit_transform(&data), b.fit_transform(&data));

        let restored = DimensionalityReducer::from_bytes(&a.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.transform(&data), a.transform(&data));
    }
}
