use chrono::{DateTime, Utc};
use clustx_cluster::{AlgorithmChoice, MetricSet, Projection};
use clustx_core::LabelAssignment;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted outcome of one clustering run.
///
/// Narrative output is not stored; it is rebuilt from this record and the
/// original dataset whenever it is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringRun {
    pub id: Uuid,
    pub dataset_name: String,
    pub created_at: DateTime<Utc>,
    pub algorithm: AlgorithmChoice,
    pub labels: LabelAssignment,
    pub metrics: MetricSet,
    pub projection: Projection,
    pub feature_names: Vec<String>,
}

impl ClusteringRun {
    /// A run that has not been saved yet. The id stays nil until a store
    /// assigns one.
    pub fn new(
        dataset_name: impl Into<String>,
        algorithm: AlgorithmChoice,
        labels: LabelAssignment,
        metrics: MetricSet,
        projection: Projection,
        feature_names: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            dataset_name: dataset_name.into(),
            created_at: Utc::now(),
            algorithm,
            labels,
            metrics,
            projection,
            feature_names,
        }
    }

    #[inline]
    pub fn is_saved(&self) -> bool {
        !self.id.is_nil()
    }
}
