//! Cluster Analysis & Narrative Generator
//!
//! Groups the original records by label and turns each group into a
//! summary, then synthesizes an executive view. A degenerate result is
//! reported as inconclusive instead of producing invented insights.

use crate::config::InsightConfig;
use crate::executive::{inconclusive, ExecutiveSummary, Synthesis};
use crate::explain::ClusteringExplanation;
use crate::importance::Importance;
use crate::noise::NoiseExplanation;
use crate::record::{extract_records, RecordDetails};
use crate::report::FeatureReport;
use crate::summary::{ClusterSummary, DatasetContext};
use crate::terminology::{DataDomain, Terminology};
use clustx_cluster::MetricSet;
use clustx_core::{Dataset, Error, LabelAssignment, Result, NOISE};
use clustx_features::PreprocessReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

const DEFAULT_DATASET_NAME: &str = "dataset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Complete,
    /// Fewer than two usable clusters; shown as a low-confidence result
    Inconclusive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAnalysis {
    pub status: AnalysisStatus,
    pub domain: DataDomain,
    pub terminology: Terminology,
    /// Records that took part in clustering
    pub total_points: usize,
    pub total_clusters: usize,
    pub noise_points: usize,
    pub cluster_summaries: Vec<ClusterSummary>,
    pub noise_explanation: Option<NoiseExplanation>,
    pub executive_summary: ExecutiveSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDetails {
    pub cluster_id: i32,
    pub summary: ClusterSummary,
    pub importance: Importance,
    pub record_count: usize,
    pub records: Vec<RecordDetails>,
    pub clustering_explanation: ClusteringExplanation,
    pub terminology: Terminology,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterAnalyzer {
    config: InsightConfig,
}

impl ClusterAnalyzer {
    pub fn new(config: InsightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Summaries for every cluster, the noise explanation and the executive summary
    pub fn analyze(
        &self,
        dataset: &Dataset,
        labels: &LabelAssignment,
        metrics: &MetricSet,
    ) -> Result<ClusterAnalysis> {
        check_alignment(dataset, labels)?;
        let ctx = DatasetContext::new(dataset, &self.config);
        let groups = group_rows(labels);
        let total = labels.len();
        let name = dataset.name().unwrap_or(DEFAULT_DATASET_NAME);

        let noise_rows = groups.get(&NOISE).cloned().unwrap_or_default();
        let clustered_rows: Vec<usize> = labels
            .iter()
            .filter(|(_, l)| *l != NOISE)
            .map(|(row, _)| row)
            .collect();

        let cluster_summaries: Vec<ClusterSummary> = groups
            .iter()
            .filter(|(label, _)| **label != NOISE)
            .map(|(label, rows)| ctx.summarize(*label, rows, total))
            .collect();

        let noise_explanation = (!noise_rows.is_empty()).then(|| {
            ctx.explain_noise(
                &noise_rows,
                &clustered_rows,
                total,
                Some(self.config.example_records),
            )
        });

        let conclusive = !labels.is_empty() && !metrics.is_degenerate() && cluster_summaries.len() >= 2;
        let (status, executive_summary) = if conclusive {
            let synthesis = Synthesis {
                dataset_name: name,
                terms: &ctx.terms,
                config: &self.config,
                summaries: &cluster_summaries,
                noise_count: noise_rows.len(),
                total,
                metrics,
            };
            (AnalysisStatus::Complete, synthesis.summarize())
        } else {
            info!(
                "Clustering of '{}' is inconclusive: {} clusters over {} records",
                name,
                cluster_summaries.len(),
                total
            );
            (
                AnalysisStatus::Inconclusive,
                inconclusive(name, &ctx.terms, total),
            )
        };

        debug!(
            "Analyzed {} clusters of '{}' as {:?}",
            cluster_summaries.len(),
            name,
            ctx.domain
        );
        Ok(ClusterAnalysis {
            status,
            domain: ctx.domain,
            terminology: ctx.terms.clone(),
            total_points: total,
            total_clusters: cluster_summaries.len(),
            noise_points: noise_rows.len(),
            cluster_summaries,
            noise_explanation,
            executive_summary,
        })
    }

    /// Everything about one cluster, every member record included.
    /// `None` when no record carries `cluster_id`.
    pub fn cluster_details(
        &self,
        dataset: &Dataset,
        labels: &LabelAssignment,
        cluster_id: i32,
    ) -> Result<Option<ClusterDetails>> {
        check_alignment(dataset, labels)?;
        if cluster_id == NOISE {
            return Ok(None);
        }
        let rows = labels.members(cluster_id);
        if rows.is_empty() {
            return Ok(None);
        }

        let ctx = DatasetContext::new(dataset, &self.config);
        let summary = ctx.summarize(cluster_id, &rows, labels.len());
        let records = extract_records(dataset, &rows);
        Ok(Some(ClusterDetails {
            cluster_id,
            importance: summary.importance.clone(),
            summary,
            record_count: records.len(),
            records,
            clustering_explanation: ClusteringExplanation::for_domain(ctx.domain, &ctx.terms),
            terminology: ctx.terms.clone(),
        }))
    }

    /// Noise explanation listing every noise record. `None` without noise.
    pub fn noise_points(
        &self,
        dataset: &Dataset,
        labels: &LabelAssignment,
    ) -> Result<Option<NoiseExplanation>> {
        check_alignment(dataset, labels)?;
        let noise_rows = labels.members(NOISE);
        if noise_rows.is_empty() {
            return Ok(None);
        }
        let clustered_rows: Vec<usize> = labels
            .iter()
            .filter(|(_, l)| *l != NOISE)
            .map(|(row, _)| row)
            .collect();
        let ctx = DatasetContext::new(dataset, &self.config);
        Ok(Some(ctx.explain_noise(
            &noise_rows,
            &clustered_rows,
            labels.len(),
            None,
        )))
    }

    pub fn feature_report(
        &self,
        dataset: &Dataset,
        report: &PreprocessReport,
        algorithm: &str,
    ) -> FeatureReport {
        FeatureReport::new(dataset, report, algorithm)
    }
}

fn check_alignment(dataset: &Dataset, labels: &LabelAssignment) -> Result<()> {
    match labels.record_index().iter().find(|&&row| row >= dataset.n_rows()) {
        Some(row) => Err(Error::InvalidConfig(format!(
            "label refers to row {} but the dataset has {} rows",
            row,
            dataset.n_rows()
        ))),
        None => Ok(()),
    }
}

/// Dataset rows per label, in label order
fn group_rows(labels: &LabelAssignment) -> BTreeMap<i32, Vec<usize>> {
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (row, label) in labels.iter() {
        groups.entry(label).or_default().push(row);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executive::InsightKind;
    use crate::importance::Priority;
    use clustx_cluster::MetricStatus;
    use clustx_core::Value;

    fn alarms() -> Dataset {
        let mut records = Vec::new();
        for i in 0..20 {
            let (code, severity, mo) = match i {
                0..=11 => ("F0283", "Critical", "compute.Blade"),
                12..=17 => ("F0100", "Warning", "equipment.Fan"),
                _ => ("F0999", "Info", "storage.Disk"),
            };
            records.push(vec![
                ("Code", Value::from(code)),
                ("OrigSeverity", Value::from(severity)),
                ("AffectedMoType", Value::from(mo)),
                ("Slot", Value::Number((i % 4) as f64)),
            ]);
        }
        Dataset::from_records(records).with_name("intersight_alarms.json")
    }

    fn labels() -> LabelAssignment {
        let labels = (0..20)
            .map(|i| match i {
                0..=11 => 0,
                12..=17 => 1,
                _ => NOISE,
            })
            .collect();
        LabelAssignment::from_labels(labels)
    }

    fn metrics(status: MetricStatus, silhouette: Option<f64>) -> MetricSet {
        MetricSet {
            status,
            silhouette_score: silhouette,
            davies_bouldin_index: silhouette.map(|_| 0.4),
            calinski_harabasz_index: silhouette.map(|_| 120.0),
            n_clusters: 2,
            n_noise: 2,
        }
    }

    #[test]
    fn test_full_analysis() {
        let analysis = ClusterAnalyzer::default()
            .analyze(&alarms(), &labels(), &metrics(MetricStatus::Computed, Some(0.62)))
            .unwrap();

        assert_eq!(analysis.status, AnalysisStatus::Complete);
        assert_eq!(analysis.domain, DataDomain::Alarm);
        assert_eq!(analysis.total_points, 20);
        assert_eq!(analysis.total_clusters, 2);
        assert_eq!(analysis.noise_points, 2);

        let first = &analysis.cluster_summaries[0];
        assert_eq!(first.size, 12);
        assert_eq!(first.percentage, 60.0);
        assert_eq!(first.importance.priority, Priority::Critical);
        assert!(first.description.contains("alarm code F0283"));
        assert_eq!(first.examples.len(), 5);

        let noise = analysis.noise_explanation.as_ref().unwrap();
        assert_eq!(noise.count, 2);
        assert_eq!(noise.code_distribution[0].value, "F0999");

        let summary = &analysis.executive_summary;
        assert_eq!(summary.title, "Analysis: intersight_alarms.json");
        assert!(summary.overview.starts_with("Analyzed 20 alarms and identified 2 distinct patterns."));
        let kinds: Vec<InsightKind> = summary.insights.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InsightKind::Primary,
                InsightKind::Critical,
                InsightKind::Info,
                InsightKind::Quality
            ]
        );
        assert!(summary.insights[1].description.starts_with("12 critical alarms"));
        assert!((2..=4).contains(&summary.recommendations.len()));
        assert!(summary.recommendations[0].starts_with("Prioritize investigation of 12 critical alarms"));
        assert!(summary.recommendations[1].starts_with("Focus on the largest cluster(s)"));
        assert!(summary.recommendations[1].ends_with(&first.description));
    }

    #[test]
    fn test_degenerate_metrics_are_inconclusive() {
        let labels = LabelAssignment::from_labels(vec![0; 20]);
        let analysis = ClusterAnalyzer::default()
            .analyze(&alarms(), &labels, &metrics(MetricStatus::Degenerate, None))
            .unwrap();
        assert_eq!(analysis.status, AnalysisStatus::Inconclusive);
        assert!(analysis.executive_summary.title.starts_with("Inconclusive analysis"));
        assert_eq!(analysis.executive_summary.recommendations.len(), 2);
        assert_eq!(analysis.cluster_summaries.len(), 1);
    }

    #[test]
    fn test_all_noise_and_empty_labels() {
        let analyzer = ClusterAnalyzer::default();
        let all_noise = LabelAssignment::from_labels(vec![NOISE; 20]);
        let analysis = analyzer
            .analyze(&alarms(), &all_noise, &metrics(MetricStatus::Degenerate, None))
            .unwrap();
        assert_eq!(analysis.status, AnalysisStatus::Inconclusive);
        assert_eq!(analysis.noise_explanation.unwrap().count, 20);

        let empty = LabelAssignment::from_labels(Vec::new());
        let analysis = analyzer
            .analyze(&alarms(), &empty, &metrics(MetricStatus::Degenerate, None))
            .unwrap();
        assert_eq!(analysis.status, AnalysisStatus::Inconclusive);
        assert!(analysis.cluster_summaries.is_empty());
    }

    #[test]
    fn test_cluster_details() {
        let analyzer = ClusterAnalyzer::default();
        let details = analyzer.cluster_details(&alarms(), &labels(), 1).unwrap().unwrap();
        assert_eq!(details.record_count, 6);
        assert_eq!(details.records[0].index, 12);
        assert_eq!(
            details.clustering_explanation.title,
            "Why Same Alarm Codes Are in Different Clusters"
        );
        assert!(analyzer.cluster_details(&alarms(), &labels(), 7).unwrap().is_none());
    }

    #[test]
    fn test_noise_points_list_everything() {
        let analyzer = ClusterAnalyzer::default();
        let noise = analyzer.noise_points(&alarms(), &labels()).unwrap().unwrap();
        assert_eq!(noise.records.len(), 2);
        let clean = LabelAssignment::from_labels(vec![0; 20]);
        assert!(analyzer.noise_points(&alarms(), &clean).unwrap().is_none());
    }

    #[test]
    fn test_rows_follow_record_index() {
        let dataset = alarms();
        let labels = LabelAssignment::new(vec![0, 0, 1, 1], vec![0, 1, 12, 13]).unwrap();
        let analysis = ClusterAnalyzer::default()
            .analyze(&dataset, &labels, &metrics(MetricStatus::Computed, Some(0.9)))
            .unwrap();
        assert!(analysis.cluster_summaries[1].description.contains("F0100"));

        let bad = LabelAssignment::new(vec![0], vec![99]).unwrap();
        assert!(ClusterAnalyzer::default()
            .analyze(&dataset, &bad, &metrics(MetricStatus::Computed, None))
            .is_err());
    }
}
