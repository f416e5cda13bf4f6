//! Seeded k-means clustering used to train product quantization codebooks.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

/// Above this many points, assignment runs on the rayon pool.
const PARALLEL_THRESHOLD: usize = 1000;

/// K-means with k-means++ initialization and Lloyd iterations.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iterations: usize,
    tolerance: f32,
    seed: u64,
}

impl KMeans {
    pub fn new(k: usize, max_iterations: usize, tolerance: f32, seed: u64) -> Self {
        Self {
            k,
            max_iterations,
            tolerance,
            seed,
        }
    }

    /// Cluster `points` into at most `k` centroids.
    ///
    /// Returns no centroids for an empty input. With fewer distinct points
    /// than `k`, some centroids may coincide.
    pub fn fit(&self, points: &[&[f32]]) -> Vec<Vec<f32>> {
        if points.is_empty() || self.k == 0 {
            return Vec::new();
        }

        let mut centroids = self.init_centroids(points);

        for iteration in 0..self.max_iterations {
            let assignments = assign(points, &centroids);
            let updated = update_centroids(points, &assignments, &centroids);
            let movement = mean_movement(&centroids, &updated);
            centroids = updated;

            if movement < self.tolerance {
                log::debug!("k-means converged after {} iterations", iteration + 1);
                break;
            }
        }

        centroids
    }

    /// k-means++ seeding: each new centroid is drawn with probability
    /// proportional to its squared distance from the nearest chosen one.
    fn init_centroids(&self, points: &[&[f32]]) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let k = self.k.min(points.len());
        let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);

        let first = rng.random_range(0..points.len());
        centroids.push(points[first].to_vec());

        while centroids.len() < k {
            let weights: Vec<f32> = points
                .iter()
                .map(|point| {
                    centroids
                        .iter()
                        .map(|c| squared_distance(point, c))
                        .fold(f32::INFINITY, f32::min)
                })
                .collect();
            let total_weight: f32 = weights.iter().sum();

            if total_weight <= 0.0 {
                let idx = rng.random_range(0..points.len());
                centroids.push(points[idx].to_vec());
                continue;
            }

            let target = rng.random::<f32>() * total_weight;
            let mut cumsum = 0.0;
            let mut chosen = points.len() - 1;
            for (i, &weight) in weights.iter().enumerate() {
                cumsum += weight;
                if cumsum >= target && weight > 0.0 {
                    chosen = i;
                    break;
                }
            }
            centroids.push(points[chosen].to_vec());
        }

        centroids
    }
}

/// Index of the centroid closest to `point` (Euclidean).
pub fn nearest_centroid(point: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}

pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn assign(points: &[&[f32]], centroids: &[Vec<f32>]) -> Vec<usize> {
    if points.len() > PARALLEL_THRESHOLD {
        points
            .par_iter()
            .map(|point| nearest_centroid(point, centroids))
            .collect()
    } else {
        points
            .iter()
            .map(|point| nearest_centroid(point, centroids))
            .collect()
    }
}

fn update_centroids(
    points: &[&[f32]],
    assignments: &[usize],
    previous: &[Vec<f32>],
) -> Vec<Vec<f32>> {
    let dimension = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0f32; dimension]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &cluster) in points.iter().zip(assignments) {
        counts[cluster] += 1;
        for (sum, &value) in sums[cluster].iter_mut().zip(point.iter()) {
            *sum += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), old)| {
            if count == 0 {
                // Empty cluster keeps its position.
                old.clone()
            } else {
                sum.into_iter().map(|s| s / count as f32).collect()
            }
        })
        .collect()
}

fn mean_movement(old: &[Vec<f32>], new: &[Vec<f32>]) -> f32 {
    if old.is_empty() {
        return 0.0;
    }
    let total: f32 = old
        .iter()
        .zip(new)
        .map(|(a, b)| squared_distance(a, b).sqrt())
        .sum();
    total / old.len() as f32
}
