//! # clustx Cluster
//!
//! Clustering engine operating on a standardized [`FeatureMatrix`]:
//!
//! - [`AlgorithmSelector`] - Picks an algorithm and parameters from the row count
//! - [`ClusteringExecutor`] - Runs k-means, DBSCAN, HDBSCAN, agglomerative or
//!   Gaussian mixture clustering
//! - [`compute_metrics`] - Silhouette, Davies-Bouldin and Calinski-Harabasz scores
//! - [`project`] - 2-D projection for display
//!
//! ## Example
//!
//! ```rust
//! use clustx_cluster::{AlgorithmSelector, ClusteringExecutor, compute_metrics, project};
//! use clustx_core::FeatureMatrix;
//!
//! let rows: Vec<Vec<f64>> = (0..20)
//!     .map(|i| if i < 10 { vec![i as f64 * 0.01, 0.0] } else { vec![5.0 + i as f64 * 0.01, 5.0] })
//!     .collect();
//! let matrix = FeatureMatrix::from_rows(&rows).unwrap();
//!
//! let choice = AlgorithmSelector::default().select(matrix.n_rows()).unwrap();
//! let labels = ClusteringExecutor::default().execute(&matrix, &choice).unwrap();
//! let metrics = compute_metrics(&matrix, &labels).unwrap();
//! let projection = project(&matrix, &labels).unwrap();
//! assert_eq!(labels.len(), 20);
//! assert_eq!(projection.coordinates.len(), 20);
//! assert!(metrics.n_clusters >= 1);
//! ```

pub mod agglomerative;
pub mod dbscan;
pub mod executor;
pub mod gmm;
pub mod hdbscan;
pub mod kmeans;
pub mod metrics;
pub mod projection;
pub mod selector;

pub use executor::{Clusterer, ClusteringExecutor};
pub use metrics::{compute_metrics, MetricSet, MetricStatus};
pub use projection::{project, Projection, ProjectionMethod, ProjectionSeries};
pub use selector::{
    Algorithm, AlgorithmChoice, AlgorithmRequest, AlgorithmSelector, CovarianceType, Linkage,
};

pub use clustx_core::FeatureMatrix;
