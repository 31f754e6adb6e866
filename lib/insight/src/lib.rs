//! # clustx Insight
//!
//! Turns a clustering result back into language a non-expert can act on:
//!
//! - [`ClusterAnalyzer`] - Cluster summaries, noise explanation and executive summary
//! - [`DataDomain`] - Domain detection so sentences talk about "customers" or "alarms"
//! - [`FeatureReport`] - Which features a run clustered on
//!
//! ## Example
//!
//! ```rust
//! use clustx_cluster::{MetricSet, MetricStatus};
//! use clustx_core::{Dataset, LabelAssignment, Value};
//! use clustx_insight::{AnalysisStatus, ClusterAnalyzer};
//!
//! let dataset = Dataset::from_records((0..6).map(|i| vec![("spend", Value::Number(i as f64))]));
//! let labels = LabelAssignment::from_labels(vec![0, 0, 0, 1, 1, 1]);
//! let metrics = MetricSet {
//!     status: MetricStatus::Computed,
//!     silhouette_score: Some(0.7),
//!     davies_bouldin_index: Some(0.3),
//!     calinski_harabasz_index: Some(27.0),
//!     n_clusters: 2,
//!     n_noise: 0,
//! };
//!
//! let analysis = ClusterAnalyzer::default().analyze(&dataset, &labels, &metrics).unwrap();
//! assert_eq!(analysis.status, AnalysisStatus::Complete);
//! assert_eq!(analysis.cluster_summaries.len(), 2);
//! ```

pub mod analyzer;
pub mod config;
pub mod executive;
pub mod explain;
pub mod importance;
pub mod noise;
pub mod record;
pub mod report;
pub mod summary;
pub mod terminology;

pub use analyzer::{AnalysisStatus, ClusterAnalysis, ClusterAnalyzer, ClusterDetails};
pub use config::InsightConfig;
pub use executive::{ExecutiveSummary, Insight, InsightKind};
pub use explain::ClusteringExplanation;
pub use importance::{assess, ClusterSignals, Importance, ImportanceReason, Priority, ReasonKind};
pub use noise::{CodeCount, NoiseExplanation};
pub use record::{extract_records, RecordDetails};
pub use report::{DataShape, FeatureDetail, FeatureReport, PreprocessingInfo};
pub use summary::{ClusterSummary, FeatureProfile, FeatureStat};
pub use terminology::{DataDomain, Terminology};
