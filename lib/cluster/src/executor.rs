//! Clustering Executor
//!
//! Dispatches a resolved [`AlgorithmChoice`] to the matching algorithm and
//! wraps the raw labels into a [`LabelAssignment`] aligned with the
//! dataset rows the matrix was built from.

use crate::agglomerative::Agglomerative;
use crate::dbscan::Dbscan;
use crate::gmm::GaussianMixture;
use crate::hdbscan::Hdbscan;
use crate::kmeans::KMeans;
use crate::selector::AlgorithmChoice;
use clustx_core::{Error, FeatureMatrix, HeuristicsConfig, LabelAssignment, Result, NOISE};
use std::time::Instant;
use tracing::{debug, info};

/// A clustering algorithm producing one label per matrix row
pub trait Clusterer {
    fn fit_predict(&self, matrix: &FeatureMatrix) -> Result<Vec<i32>>;
}

#[derive(Debug, Clone, Default)]
pub struct ClusteringExecutor {
    config: HeuristicsConfig,
}

impl ClusteringExecutor {
    pub fn new(config: HeuristicsConfig) -> Self {
        Self { config }
    }

    /// Run `choice` over `matrix`. The matrix is only read.
    pub fn execute(&self, matrix: &FeatureMatrix, choice: &AlgorithmChoice) -> Result<LabelAssignment> {
        choice.validate(matrix.n_rows())?;
        let start = Instant::now();

        let clusterer: Box<dyn Clusterer> = match *choice {
            AlgorithmChoice::KMeans { n_clusters } => {
                Box::new(KMeans::new(n_clusters).with_config(&self.config))
            }
            AlgorithmChoice::Dbscan { eps, min_samples } => Box::new(Dbscan::new(eps, min_samples)),
            AlgorithmChoice::Hdbscan {
                min_cluster_size,
                min_samples,
            } => Box::new(Hdbscan::new(min_cluster_size, min_samples)),
            AlgorithmChoice::Hierarchical {
                n_clusters,
                linkage,
            } => Box::new(Agglomerative::new(n_clusters, linkage)),
            AlgorithmChoice::Gmm {
                n_components,
                covariance_type,
            } => Box::new(
                GaussianMixture::new(n_components, covariance_type).with_config(&self.config),
            ),
        };

        let labels = clusterer.fit_predict(matrix)?;
        if labels.len() != matrix.n_rows() {
            return Err(Error::ClusteringExecution(format!(
                "{} returned {} labels for {} rows",
                choice.algorithm(),
                labels.len(),
                matrix.n_rows()
            )));
        }
        if !choice.algorithm().produces_noise() && labels.contains(&NOISE) {
            return Err(Error::ClusteringExecution(format!(
                "{} produced noise labels",
                choice.algorithm()
            )));
        }

        let assignment = LabelAssignment::new(labels, matrix.record_index().to_vec())?;
        info!(
            "{} finished in {:?}: {} clusters, {} noise points",
            choice,
            start.elapsed(),
            assignment.cluster_count(),
            assignment.noise_count()
        );
        debug!("cluster sizes: {:?}", assignment.cluster_sizes());
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{CovarianceType, Linkage};

    fn matrix() -> FeatureMatrix {
        let rows: Vec<Vec<f64>> = (0..12)
            .map(|i| {
                let base = if i < 6 { 0.0 } else { 8.0 };
                vec![base + (i % 3) as f64 * 0.1, base + (i % 2) as f64 * 0.1]
            })
            .collect();
        FeatureMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_every_algorithm_labels_every_row() {
        let m = matrix();
        let executor = ClusteringExecutor::default();
        let choices = [
            AlgorithmChoice::KMeans { n_clusters: 2 },
            AlgorithmChoice::Dbscan {
                eps: 0.5,
                min_samples: 3,
            },
            AlgorithmChoice::Hdbscan {
                min_cluster_size: 3,
                min_samples: 2,
            },
            AlgorithmChoice::Hierarchical {
                n_clusters: 2,
                linkage: Linkage::Ward,
            },
            AlgorithmChoice::Gmm {
                n_components: 2,
                covariance_type: CovarianceType::Diag,
            },
        ];
        for choice in &choices {
            let labels = executor.execute(&m, choice).unwrap();
            assert_eq!(labels.len(), m.n_rows(), "{}", choice);
            assert_eq!(labels.cluster_count(), 2, "{}", choice);
        }
    }

    #[test]
    fn test_record_index_is_carried() {
        let m = FeatureMatrix::new(
            vec![0.0, 0.1, 5.0, 5.1],
            1,
            vec!["x".to_string()],
            vec![0, 2, 3, 7],
        )
        .unwrap();
        let labels = ClusteringExecutor::default()
            .execute(&m, &AlgorithmChoice::KMeans { n_clusters: 2 })
            .unwrap();
        assert_eq!(labels.record_index(), &[0, 2, 3, 7]);
    }

    #[test]
    fn test_more_clusters_than_rows() {
        let m = FeatureMatrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0], vec![4.0]])
            .unwrap();
        let result =
            ClusteringExecutor::default().execute(&m, &AlgorithmChoice::KMeans { n_clusters: 10 });
        assert!(matches!(result, Err(Error::InsufficientSamples { .. })));
    }
}
