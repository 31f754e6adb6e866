//! K-means with k-means++ seeding and several restarts

use crate::executor::Clusterer;
use clustx_core::distance::{nearest_center, squared_euclidean};
use clustx_core::{Error, FeatureMatrix, HeuristicsConfig, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct KMeans {
    n_clusters: usize,
    max_iter: usize,
    tolerance: f64,
    n_init: usize,
    seed: u64,
}

/// Result of the best restart
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub labels: Vec<i32>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    pub n_iter: usize,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        let defaults = HeuristicsConfig::default();
        Self {
            n_clusters,
            max_iter: defaults.kmeans_max_iter,
            tolerance: defaults.kmeans_tolerance,
            n_init: defaults.kmeans_n_init,
            seed: defaults.random_seed,
        }
    }

    /// Take iteration limits and seed from `config`
    #[must_use]
    pub fn with_config(mut self, config: &HeuristicsConfig) -> Self {
        self.max_iter = config.kmeans_max_iter;
        self.tolerance = config.kmeans_tolerance;
        self.n_init = config.kmeans_n_init;
        self.seed = config.random_seed;
        self
    }

    #[must_use]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&self, matrix: &FeatureMatrix) -> Result<KMeansFit> {
        let n = matrix.n_rows();
        if self.n_clusters == 0 {
            return Err(Error::ClusteringExecution(
                "n_clusters must be at least 1".to_string(),
            ));
        }
        if n < self.n_clusters {
            return Err(Error::InsufficientSamples {
                required: self.n_clusters,
                actual: n,
            });
        }

        // Convergence threshold is relative to the data spread
        let tol = self.tolerance * mean_variance(matrix);

        let mut seeder = StdRng::seed_from_u64(self.seed);
        let seeds: Vec<u64> = (0..self.n_init).map(|_| seeder.random()).collect();

        let best = seeds
            .par_iter()
            .map(|&seed| self.run_once(matrix, seed, tol))
            .collect::<Vec<_>>()
            .into_iter()
            .reduce(|best, fit| if fit.inertia < best.inertia { fit } else { best })
            .ok_or_else(|| Error::ClusteringExecution("no k-means restarts ran".to_string()))?;

        debug!(
            "k-means k={} converged in {} iterations, inertia {:.4}",
            self.n_clusters, best.n_iter, best.inertia
        );
        Ok(best)
    }

    fn run_once(&self, matrix: &FeatureMatrix, seed: u64, tol: f64) -> KMeansFit {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = init_plus_plus(matrix, self.n_clusters, &mut rng);
        let mut assignment = assign(matrix, &centroids);
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            let updated = update_centroids(matrix, &assignment, &centroids);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_euclidean(old, new))
                .sum();
            centroids = updated;
            assignment = assign(matrix, &centroids);
            if shift <= tol {
                break;
            }
        }

        let inertia = assignment.iter().map(|(_, d)| d).sum();
        KMeansFit {
            labels: assignment.iter().map(|(c, _)| *c as i32).collect(),
            centroids,
            inertia,
            n_iter,
        }
    }
}

impl Clusterer for KMeans {
    fn fit_predict(&self, matrix: &FeatureMatrix) -> Result<Vec<i32>> {
        Ok(self.fit(matrix)?.labels)
    }
}

/// k-means++: each new center is drawn with probability proportional to the
/// squared distance from the closest existing center
fn init_plus_plus(matrix: &FeatureMatrix, k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = matrix.n_rows();
    let mut centers = Vec::with_capacity(k);
    centers.push(matrix.row(rng.random_range(0..n)).to_vec());

    let mut closest: Vec<f64> = matrix
        .rows()
        .map(|row| squared_euclidean(row, &centers[0]))
        .collect();

    while centers.len() < k {
        let total: f64 = closest.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = n - 1;
            for (i, d) in closest.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // every point coincides with a center
            rng.random_range(0..n)
        };

        let center = matrix.row(next).to_vec();
        for (d, row) in closest.iter_mut().zip(matrix.rows()) {
            *d = d.min(squared_euclidean(row, &center));
        }
        centers.push(center);
    }
    centers
}

fn assign(matrix: &FeatureMatrix, centroids: &[Vec<f64>]) -> Vec<(usize, f64)> {
    (0..matrix.n_rows())
        .into_par_iter()
        .map(|i| nearest_center(matrix.row(i), centroids))
        .collect()
}

/// Mean of the assigned points. An empty cluster takes over the point
/// farthest from its current centroid.
fn update_centroids(
    matrix: &FeatureMatrix,
    assignment: &[(usize, f64)],
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let k = previous.len();
    let dim = matrix.n_features();
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0usize; k];

    for (row, (c, _)) in matrix.rows().zip(assignment) {
        counts[*c] += 1;
        for (s, v) in sums[*c].iter_mut().zip(row) {
            *s += v;
        }
    }

    let mut taken = vec![false; matrix.n_rows()];
    for c in 0..k {
        if counts[c] > 0 {
            let count = counts[c] as f64;
            sums[c].iter_mut().for_each(|s| *s /= count);
            continue;
        }
        let farthest = assignment
            .iter()
            .enumerate()
            .filter(|(i, _)| !taken[*i])
            .max_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
            .map(|(i, _)| i);
        match farthest {
            Some(i) => {
                taken[i] = true;
                sums[c] = matrix.row(i).to_vec();
            }
            None => sums[c] = previous[c].clone(),
        }
    }
    sums
}

fn mean_variance(matrix: &FeatureMatrix) -> f64 {
    let n = matrix.n_rows() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let means = matrix.column_means();
    let total: f64 = matrix
        .rows()
        .map(|row| squared_euclidean(row, &means))
        .sum();
    total / (n * matrix.n_features() as f64)
}
