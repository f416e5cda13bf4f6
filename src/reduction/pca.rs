//! Principal component analysis by power iteration.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A fitted linear projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    /// Per-dimension mean of the training set.
    pub mean: Vec<f32>,
    /// Unit-length principal axes, strongest first.
    pub components: Vec<Vec<f32>>,
    /// Share of total variance captured by each component.
    pub explained_variance_ratio: Vec<f32>,
}

impl Pca {
    /// Fit `n_components` principal axes.
    ///
    /// `data` must be non-empty and rectangular.
    pub fn fit(
        data: &[Vec<f32>],
        n_components: usize,
        max_iterations: usize,
        tolerance: f64,
        seed: u64,
    ) -> Self {
        let n = data.len();
        let dim = data.first().map_or(0, Vec::len);

        let mut mean = vec![0.0f64; dim];
        for row in data {
            for (m, &x) in mean.iter_mut().zip(row) {
                *m += x as f64;
            }
        }
        for m in &mut mean {
            *m /= n as f64;
        }

        let mut covariance = covariance(data, &mean);
        let total_variance: f64 = (0..dim).map(|i| covariance[i][i]).sum();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut components: Vec<Vec<f64>> = Vec::with_capacity(n_components);
        let mut ratios = Vec::with_capacity(n_components);

        for _ in 0..n_components {
            let (vector, eigenvalue) = power_iteration(
                &covariance,
                &components,
                max_iterations,
                tolerance,
                &mut rng,
            );

            // Deflate so the next iteration finds the next axis.
            for i in 0..dim {
                for j in 0..dim {
                    covariance[i][j] -= eigenvalue * vector[i] * vector[j];
                }
            }

            ratios.push(if total_variance > 0.0 {
                (eigenvalue / total_variance) as f32
            } else {
                0.0
            });
            components.push(vector);
        }

        Self {
            mean: mean.into_iter().map(|m| m as f32).collect(),
            components: components
                .into_iter()
                .map(|c| c.into_iter().map(|x| x as f32).collect())
                .collect(),
            explained_variance_ratio: ratios,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.mean.len()
    }

    pub fn output_dim(&self) -> usize {
        self.components.len()
    }

    /// Total share of variance captured.
    pub fn explained_variance(&self) -> f32 {
        self.explained_variance_ratio.iter().sum()
    }

    /// Project one vector onto the principal axes.
    pub fn project(&self, vector: &[f32]) -> Vec<f32> {
        self.components
            .iter()
            .map(|component| {
                vector
                    .iter()
                    .zip(&self.mean)
                    .zip(component)
                    .map(|((x, m), c)| (x - m) * c)
                    .sum()
            })
            .collect()
    }
}

fn covariance(data: &[Vec<f32>], mean: &[f64]) -> Vec<Vec<f64>> {
    let dim = mean.len();
    let denominator = (data.len().max(2) - 1) as f64;

    (0..dim)
        .into_par_iter()
        .map(|i| {
            let mut row = vec![0.0f64; dim];
            for sample in data {
                let xi = sample[i] as f64 - mean[i];
                for (j, value) in row.iter_mut().enumerate() {
                    *value += xi * (sample[j] as f64 - mean[j]);
                }
            }
            row.iter_mut().for_each(|v| *v /= denominator);
            row
        })
        .collect()
}

fn power_iteration(
    matrix: &[Vec<f64>],
    previous: &[Vec<f64>],
    max_iterations: usize,
    tolerance: f64,
    rng: &mut StdRng,
) -> (Vec<f64>, f64) {
    let dim = matrix.len();
    let mut vector: Vec<f64> = (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect();
    orthogonalize(&mut vector, previous);
    normalize(&mut vector);

    let mut eigenvalue = 0.0;
    for _ in 0..max_iterations {
        let mut next: Vec<f64> = matrix
            .iter()
            .map(|row| row.iter().zip(&vector).map(|(a, b)| a * b).sum())
            .collect();
        orthogonalize(&mut next, previous);

        let length = norm(&next);
        if length <= f64::EPSILON {
            // No variance left in the remaining subspace.
            eigenvalue = 0.0;
            break;
        }
        next.iter_mut().for_each(|x| *x /= length);
        eigenvalue = length;

        let alignment: f64 = next.iter().zip(&vector).map(|(a, b)| a * b).sum();
        vector = next;
        if 1.0 - alignment.abs() < tolerance {
            break;
        }
    }

    (vector, eigenvalue)
}

fn orthogonalize(vector: &mut [f64], basis: &[Vec<f64>]) {
    for axis in basis {
        let projection: f64 = vector.iter().zip(axis).map(|(a, b)| a * b).sum();
        for (v, a) in vector.iter_mut().zip(axis) {
            *v -= projection * a;
        }
    }
}

fn norm(vector: &[f64]) -> f64 {
    vector.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn normalize(vector: &mut [f64]) {
    let n = norm(vector);
    if n > 0.0 {
        vector.iter_mut().for_each(|x| *x /= n);
    }
}
