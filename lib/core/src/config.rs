use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Named constants behind algorithm selection and execution.
///
/// `Default` reproduces the automatic policy:
///
/// | rows            | algorithm                                   |
/// |-----------------|---------------------------------------------|
/// | `n <= 50`       | k-means, `k = min(3, n - 1)`                |
/// | `50 < n <= 100` | DBSCAN, `eps = 0.5`, `min_samples = max(3, n / 20)` |
/// | `n > 100`       | HDBSCAN, `min_cluster_size = max(5, n / 20)`, `min_samples = max(3, mcs / 2)` |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig {
    /// Below this row count selection is always k-means, whatever the other bands say
    pub small_sample_threshold: usize,
    /// Largest row count still clustered with k-means
    pub centroid_max_samples: usize,
    /// Largest row count clustered with radius-based DBSCAN
    pub radius_density_max_samples: usize,
    pub default_cluster_count: usize,

    /// Neighbourhood radius in standardized units
    pub dbscan_eps: f64,
    pub neighbor_divisor: usize,
    pub min_neighbors: usize,

    pub hdbscan_min_cluster_size_floor: usize,
    pub hdbscan_cluster_size_divisor: usize,
    pub hdbscan_min_samples_floor: usize,

    pub kmeans_max_iter: usize,
    pub kmeans_tolerance: f64,
    pub kmeans_n_init: usize,
    pub random_seed: u64,

    pub gmm_max_iter: usize,
    pub gmm_tolerance: f64,
    /// Added to covariance diagonals to keep them positive definite
    pub gmm_reg_covar: f64,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            small_sample_threshold: 10,
            centroid_max_samples: 50,
            radius_density_max_samples: 100,
            default_cluster_count: 3,
            dbscan_eps: 0.5,
            neighbor_divisor: 20,
            min_neighbors: 3,
            hdbscan_min_cluster_size_floor: 5,
            hdbscan_cluster_size_divisor: 20,
            hdbscan_min_samples_floor: 3,
            kmeans_max_iter: 300,
            kmeans_tolerance: 1e-4,
            kmeans_n_init: 10,
            random_seed: 42,
            gmm_max_iter: 100,
            gmm_tolerance: 1e-3,
            gmm_reg_covar: 1e-6,
        }
    }
}

impl HeuristicsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.small_sample_threshold > self.radius_density_max_samples
            || self.centroid_max_samples > self.radius_density_max_samples
        {
            return Err(Error::InvalidConfig(format!(
                "small ({}) and centroid ({}) sample bands must not exceed the radius band ({})",
                self.small_sample_threshold,
                self.centroid_max_samples,
                self.radius_density_max_samples
            )));
        }
        if self.default_cluster_count == 0 {
            return Err(Error::InvalidConfig(
                "default_cluster_count must be at least 1".to_string(),
            ));
        }
        if !(self.dbscan_eps.is_finite() && self.dbscan_eps > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "dbscan_eps must be positive, got {}",
                self.dbscan_eps
            )));
        }
        if self.neighbor_divisor == 0 || self.hdbscan_cluster_size_divisor == 0 {
            return Err(Error::InvalidConfig("divisors must be non-zero".to_string()));
        }
        if self.min_neighbors == 0
            || self.hdbscan_min_cluster_size_floor < 2
            || self.hdbscan_min_samples_floor == 0
        {
            return Err(Error::InvalidConfig(
                "density floors must be positive (min cluster size at least 2)".to_string(),
            ));
        }
        if self.kmeans_max_iter == 0 || self.kmeans_n_init == 0 || self.gmm_max_iter == 0 {
            return Err(Error::InvalidConfig(
                "iteration counts must be at least 1".to_string(),
            ));
        }
        for (name, v) in [
            ("kmeans_tolerance", self.kmeans_tolerance),
            ("gmm_tolerance", self.gmm_tolerance),
            ("gmm_reg_covar", self.gmm_reg_covar),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, v
                )));
            }
        }
        Ok(())
    }

    /// Cluster count for centroid-based runs, capped at `n - 1`
    #[inline]
    pub fn cluster_count_for(&self, n: usize) -> usize {
        self.default_cluster_count.min(n.saturating_sub(1)).max(1)
    }

    /// DBSCAN `min_samples` for `n` rows
    #[inline]
    pub fn dbscan_min_samples_for(&self, n: usize) -> usize {
        self.min_neighbors.max(n / self.neighbor_divisor)
    }

    /// HDBSCAN `min_cluster_size` for `n` rows
    #[inline]
    pub fn hdbscan_min_cluster_size_for(&self, n: usize) -> usize {
        self.hdbscan_min_cluster_size_floor
            .max(n / self.hdbscan_cluster_size_divisor)
    }

    /// HDBSCAN `min_samples` for a given `min_cluster_size`
    #[inline]
    pub fn hdbscan_min_samples_for(&self, min_cluster_size: usize) -> usize {
        self.hdbscan_min_samples_floor.max(min_cluster_size / 2)
    }
}
