//! # clustx
//!
//! Automatic clustering for tabular data. Hand it a dataset and it prepares
//! the features, picks an algorithm from the sample count, clusters, scores
//! the result, projects it to two dimensions and explains the clusters in
//! plain language.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! cargo install clustx
//! clustx run customers.csv --output run.json
//! clustx analyze customers.csv --algorithm kmeans --n-clusters 4
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use clustx::prelude::*;
//!
//! let dataset = Dataset::from_records((0..30).map(|i| {
//!     let base = if i < 15 { 0.0 } else { 10.0 };
//!     vec![
//!         ("spend", Value::Number(base + (i % 5) as f64 * 0.1)),
//!         ("visits", Value::Number(base + (i % 3) as f64 * 0.1)),
//!     ]
//! }))
//! .with_name("customers");
//!
//! let pipeline = Pipeline::default();
//! let outcome = pipeline.run_clustering(&dataset, None).unwrap();
//! assert_eq!(outcome.labels.len(), 30);
//!
//! let analysis = pipeline.analyze_clusters(&dataset, &outcome).unwrap();
//! assert!(analysis.total_clusters >= 1);
//! ```
//!
//! ## Crate Structure
//!
//! - [`clustx-core`](https://docs.rs/clustx-core) - Dataset, feature matrix, labels, heuristics
//! - [`clustx-features`](https://docs.rs/clustx-features) - Ingestion and feature preparation
//! - [`clustx-cluster`](https://docs.rs/clustx-cluster) - Selection, algorithms, metrics, projection
//! - [`clustx-insight`](https://docs.rs/clustx-insight) - Cluster summaries and narratives
//! - [`clustx-storage`](https://docs.rs/clustx-storage) - Persisted clustering runs

pub mod config;

pub use config::Config;

// Re-export core types
pub use clustx_core::{
    Dataset, Error, FeatureMatrix, HeuristicsConfig, LabelAssignment, Record, Result, Value,
    NOISE,
};

pub use clustx_features::{
    load_dataset, FeaturePreprocessor, PreparedFeatures, PreprocessReport,
};

pub use clustx_cluster::{
    compute_metrics, project, Algorithm, AlgorithmChoice, AlgorithmRequest, AlgorithmSelector,
    ClusteringExecutor, CovarianceType, Linkage, MetricSet, MetricStatus, Projection,
};

pub use clustx_insight::{
    AnalysisStatus, ClusterAnalysis, ClusterAnalyzer, ClusterDetails, FeatureReport,
    InsightConfig, NoiseExplanation,
};

pub use clustx_storage::{ClusteringRun, FileRunStore, MemoryRunStore, RunStore};

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Everything one clustering run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringOutcome {
    pub algorithm: AlgorithmChoice,
    pub labels: LabelAssignment,
    pub metrics: MetricSet,
    pub projection: Projection,
    pub report: PreprocessReport,
}

impl ClusteringOutcome {
    /// Unsaved run record for a [`RunStore`]
    pub fn into_run(self, dataset_name: impl Into<String>) -> ClusteringRun {
        ClusteringRun::new(
            dataset_name,
            self.algorithm,
            self.labels,
            self.metrics,
            self.projection,
            self.report.feature_names,
        )
    }
}

/// Preprocess, select, cluster, score and project in one call
#[derive(Debug, Clone)]
pub struct Pipeline {
    preprocessor: FeaturePreprocessor,
    selector: AlgorithmSelector,
    executor: ClusteringExecutor,
    analyzer: ClusterAnalyzer,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            preprocessor: FeaturePreprocessor::new(),
            selector: AlgorithmSelector::new(config.heuristics.clone()),
            executor: ClusteringExecutor::new(config.heuristics),
            analyzer: ClusterAnalyzer::new(config.insight),
        }
    }

    pub fn prepare(&self, dataset: &Dataset) -> Result<PreparedFeatures> {
        self.preprocessor.fit_transform(dataset)
    }

    /// Run every numeric stage over `dataset`.
    ///
    /// `request` overrides the automatic algorithm choice. Metrics and the
    /// projection only read the matrix and labels, so they run in parallel.
    pub fn run_clustering(
        &self,
        dataset: &Dataset,
        request: Option<&AlgorithmRequest>,
    ) -> Result<ClusteringOutcome> {
        let start = Instant::now();
        let PreparedFeatures { matrix, report } = self.prepare(dataset)?;
        let algorithm = self.selector.resolve(matrix.n_rows(), request)?;
        let labels = self.executor.execute(&matrix, &algorithm)?;

        let (metrics, projection) = rayon::join(
            || compute_metrics(&matrix, &labels),
            || project(&matrix, &labels),
        );
        let metrics = metrics?;
        let projection = projection?;

        if metrics.is_degenerate() {
            warn!(
                "{} produced {} clusters over {} rows; quality metrics are undefined",
                algorithm,
                metrics.n_clusters,
                labels.len()
            );
        }
        info!(
            "Clustered {} rows into {} clusters ({} noise) in {:?}",
            labels.len(),
            metrics.n_clusters,
            metrics.n_noise,
            start.elapsed()
        );

        Ok(ClusteringOutcome {
            algorithm,
            labels,
            metrics,
            projection,
            report,
        })
    }

    /// Narrative analysis of a finished run
    pub fn analyze_clusters(
        &self,
        dataset: &Dataset,
        outcome: &ClusteringOutcome,
    ) -> Result<ClusterAnalysis> {
        self.analyze(dataset, &outcome.labels, &outcome.metrics)
    }

    /// Narrative analysis of a stored run
    pub fn analyze_run(&self, dataset: &Dataset, run: &ClusteringRun) -> Result<ClusterAnalysis> {
        self.analyze(dataset, &run.labels, &run.metrics)
    }

    pub fn analyze(
        &self,
        dataset: &Dataset,
        labels: &LabelAssignment,
        metrics: &MetricSet,
    ) -> Result<ClusterAnalysis> {
        self.analyzer.analyze(dataset, labels, metrics)
    }

    pub fn cluster_details(
        &self,
        dataset: &Dataset,
        labels: &LabelAssignment,
        cluster_id: i32,
    ) -> Result<Option<ClusterDetails>> {
        self.analyzer.cluster_details(dataset, labels, cluster_id)
    }

    pub fn noise_points(
        &self,
        dataset: &Dataset,
        labels: &LabelAssignment,
    ) -> Result<Option<NoiseExplanation>> {
        self.analyzer.noise_points(dataset, labels)
    }

    /// Features the pipeline would cluster `dataset` on, and with which algorithm
    pub fn feature_report(
        &self,
        dataset: &Dataset,
        request: Option<&AlgorithmRequest>,
    ) -> Result<FeatureReport> {
        let prepared = self.prepare(dataset)?;
        let algorithm = self.selector.resolve(prepared.matrix.n_rows(), request)?;
        Ok(self.analyzer.feature_report(
            dataset,
            &prepared.report,
            algorithm.algorithm().display_name(),
        ))
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Algorithm, AlgorithmChoice, AlgorithmRequest, AnalysisStatus, ClusterAnalysis,
        ClusteringOutcome, ClusteringRun, Config, Dataset, Error, FileRunStore, LabelAssignment,
        MemoryRunStore, MetricSet, Pipeline, Projection, Result, RunStore, Value, NOISE,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_groups() -> Dataset {
        Dataset::from_records((0..20).map(|i| {
            let base = if i % 2 == 0 { 0.0 } else { 8.0 };
            vec![
                ("x", Value::Number(base + (i % 4) as f64 * 0.1)),
                ("y", Value::Number(base - (i % 5) as f64 * 0.1)),
                ("segment", Value::from(if i % 2 == 0 { "retail" } else { "online" })),
            ]
        }))
        .with_name("customers.csv")
    }

    #[test]
    fn test_pipeline_requested_kmeans() {
        let dataset = two_groups();
        let pipeline = Pipeline::default();
        let request = AlgorithmRequest::new(Algorithm::KMeans).with_n_clusters(2);
        let outcome = pipeline.run_clustering(&dataset, Some(&request)).unwrap();

        assert_eq!(outcome.algorithm, AlgorithmChoice::KMeans { n_clusters: 2 });
        assert_eq!(outcome.labels.len(), dataset.n_rows());
        assert_eq!(outcome.labels.cluster_count(), 2);
        assert_eq!(outcome.metrics.status, MetricStatus::Computed);
        assert!(outcome.metrics.silhouette_score.unwrap() > 0.8);
        assert_eq!(outcome.projection.coordinates.len(), dataset.n_rows());
        assert_eq!(outcome.report.feature_names, vec!["x", "y"]);

        // even rows and odd rows end up in different clusters
        let labels = outcome.labels.as_slice();
        assert!(labels.iter().step_by(2).all(|&l| l == labels[0]));
        assert!(labels.iter().skip(1).step_by(2).all(|&l| l == labels[1]));
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn test_pipeline_analysis() {
        let dataset = two_groups();
        let pipeline = Pipeline::default();
        let request = AlgorithmRequest::new(Algorithm::KMeans).with_n_clusters(2);
        let outcome = pipeline.run_clustering(&dataset, Some(&request)).unwrap();

        let analysis = pipeline.analyze_clusters(&dataset, &outcome).unwrap();
        assert_eq!(analysis.status, AnalysisStatus::Complete);
        assert_eq!(analysis.total_clusters, 2);
        assert_eq!(analysis.total_points, 20);
        assert!(analysis.noise_explanation.is_none());

        let details = pipeline
            .cluster_details(&dataset, &outcome.labels, outcome.labels.as_slice()[0])
            .unwrap()
            .unwrap();
        assert_eq!(details.record_count, 10);
        assert!(pipeline.cluster_details(&dataset, &outcome.labels, 7).unwrap().is_none());
        assert!(pipeline.noise_points(&dataset, &outcome.labels).unwrap().is_none());
    }

    #[test]
    fn test_outcome_into_run() {
        let dataset = two_groups();
        let pipeline = Pipeline::default();
        let outcome = pipeline.run_clustering(&dataset, None).unwrap();
        let run = outcome.clone().into_run("customers.csv");

        assert!(!run.is_saved());
        assert_eq!(run.labels, outcome.labels);
        assert_eq!(run.feature_names, outcome.report.feature_names);

        let store = MemoryRunStore::new();
        let saved = store.save(run).unwrap();
        let analysis = pipeline.analyze_run(&dataset, &saved).unwrap();
        assert_eq!(analysis.total_points, 20);
    }

    #[test]
    fn test_feature_report_names_algorithm() {
        let dataset = two_groups();
        let report = Pipeline::default().feature_report(&dataset, None).unwrap();
        assert_eq!(report.preprocessing_info.algorithm, "K-Means");
        assert_eq!(report.total_features, 2);
    }

    #[test]
    fn test_insufficient_features() {
        let dataset = Dataset::from_records((0..5).map(|_| vec![("kind", Value::from("same"))]));
        let err = Pipeline::default().run_clustering(&dataset, None).unwrap_err();
        assert!(matches!(err, Error::InsufficientFeatures(_)));
    }
}
