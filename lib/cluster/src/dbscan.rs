//! DBSCAN: radius-based density clustering

use crate::executor::Clusterer;
use clustx_core::distance::squared_euclidean;
use clustx_core::{Error, FeatureMatrix, Result, NOISE};
use rayon::prelude::*;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Dbscan {
    eps: f64,
    /// Neighbourhood size (the point itself included) that makes a core point
    min_samples: usize,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    /// Indices within `eps` of every row, the row itself included
    fn neighbourhoods(&self, matrix: &FeatureMatrix) -> Vec<Vec<usize>> {
        let eps_sq = self.eps * self.eps;
        (0..matrix.n_rows())
            .into_par_iter()
            .map(|i| {
                let a = matrix.row(i);
                matrix
                    .rows()
                    .enumerate()
                    .filter(|(_, b)| squared_euclidean(a, b) <= eps_sq)
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect()
    }
}

impl Clusterer for Dbscan {
    fn fit_predict(&self, matrix: &FeatureMatrix) -> Result<Vec<i32>> {
        if !(self.eps.is_finite() && self.eps > 0.0) || self.min_samples == 0 {
            return Err(Error::ClusteringExecution(format!(
                "invalid DBSCAN parameters eps={} min_samples={}",
                self.eps, self.min_samples
            )));
        }

        let n = matrix.n_rows();
        let neighbours = self.neighbourhoods(matrix);
        let is_core: Vec<bool> = neighbours
            .iter()
            .map(|nb| nb.len() >= self.min_samples)
            .collect();

        let mut labels = vec![NOISE; n];
        let mut next_label = 0;
        let mut queue = VecDeque::new();

        for start in 0..n {
            if labels[start] != NOISE || !is_core[start] {
                continue;
            }
            labels[start] = next_label;
            queue.push_back(start);

            while let Some(point) = queue.pop_front() {
                if !is_core[point] {
                    continue;
                }
                for &nb in &neighbours[point] {
                    if labels[nb] == NOISE {
                        labels[nb] = next_label;
                        queue.push_back(nb);
                    }
                }
            }
            next_label += 1;
        }

        let n_noise = labels.iter().filter(|&&l| l == NOISE).count();
        debug!(
            "DBSCAN eps={} min_samples={} found {} clusters, {} noise points",
            self.eps, self.min_samples, next_label, n_noise
        );
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_groups_and_outlier() {
        let m = FeatureMatrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![5.0, 5.0],
            vec![5.1, 5.0],
            vec![5.0, 5.1],
            vec![20.0, 20.0],
        ])
        .unwrap();
        let labels = Dbscan::new(0.5, 3).fit_predict(&m).unwrap();
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1, NOISE]);
    }

    #[test]
    fn test_border_point_joins_cluster() {
        // the last point reaches only one core point
        let m = FeatureMatrix::from_rows(&[
            vec![0.0],
            vec![0.1],
            vec![0.2],
            vec![0.65],
        ])
        .unwrap();
        let labels = Dbscan::new(0.5, 3).fit_predict(&m).unwrap();
        assert_eq!(labels, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_all_noise_when_sparse() {
        let m = FeatureMatrix::from_rows(&[vec![0.0], vec![10.0], vec![20.0]]).unwrap();
        let labels = Dbscan::new(0.5, 2).fit_predict(&m).unwrap();
        assert!(labels.iter().all(|&l| l == NOISE));
    }

    #[test]
    fn test_rejects_non_positive_eps() {
        let m = FeatureMatrix::from_rows(&[vec![0.0], vec![1.0]]).unwrap();
        assert!(Dbscan::new(0.0, 2).fit_predict(&m).is_err());
    }
}
