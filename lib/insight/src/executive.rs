//! Executive-level synthesis across all clusters

use crate::config::InsightConfig;
use crate::importance::Priority;
use crate::summary::ClusterSummary;
use crate::terminology::Terminology;
use clustx_cluster::MetricSet;
use serde::{Deserialize, Serialize};

const MIN_RECOMMENDATIONS: usize = 2;
const MAX_RECOMMENDATIONS: usize = 4;
const STRONG_SILHOUETTE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Primary,
    Critical,
    Priority,
    Info,
    Quality,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub title: String,
    pub overview: String,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<String>,
}

/// Inputs to the synthesis
pub(crate) struct Synthesis<'a> {
    pub dataset_name: &'a str,
    pub terms: &'a Terminology,
    pub config: &'a InsightConfig,
    pub summaries: &'a [ClusterSummary],
    pub noise_count: usize,
    pub total: usize,
    pub metrics: &'a MetricSet,
}

impl Synthesis<'_> {
    pub fn summarize(&self) -> ExecutiveSummary {
        let plural = &self.terms.plural;
        let largest = self
            .summaries
            .iter()
            .max_by(|a, b| a.size.cmp(&b.size).then(b.cluster_id.cmp(&a.cluster_id)));

        let mut insights = Vec::new();
        if let Some(largest) = largest {
            insights.push(Insight {
                kind: InsightKind::Primary,
                title: "Largest Group".to_string(),
                description: format!(
                    "{} {} ({:.1}%) share similar characteristics: {}",
                    largest.size, plural, largest.percentage, largest.description
                ),
            });
        }

        let critical: Vec<&ClusterSummary> = self
            .summaries
            .iter()
            .filter(|s| s.importance.priority == Priority::Critical)
            .collect();
        let critical_count: usize = critical.iter().map(|s| s.size).sum();
        if !critical.is_empty() {
            insights.push(Insight {
                kind: InsightKind::Critical,
                title: "Critical Items".to_string(),
                description: format!(
                    "{} critical {} identified across {} {}",
                    critical_count,
                    plural,
                    critical.len(),
                    if critical.len() == 1 { "cluster" } else { "clusters" }
                ),
            });
        }

        let high: Vec<String> = self
            .summaries
            .iter()
            .filter(|s| s.importance.priority == Priority::High)
            .filter(|s| Some(s.cluster_id) != largest.map(|l| l.cluster_id))
            .map(|s| format!("Cluster {} ({:.1}%)", s.cluster_id, s.percentage))
            .collect();
        if !high.is_empty() {
            insights.push(Insight {
                kind: InsightKind::Priority,
                title: "High Priority Groups".to_string(),
                description: format!("Also rated high priority: {}", high.join(", ")),
            });
        }

        if self.noise_count > 0 {
            insights.push(Insight {
                kind: InsightKind::Info,
                title: "Unique Cases".to_string(),
                description: format!(
                    "{} {} ({:.1}%) are unique and don't fit into major patterns - may require individual attention",
                    self.noise_count,
                    plural,
                    100.0 * self.noise_count as f64 / self.total.max(1) as f64
                ),
            });
        }

        if let Some(score) = self.metrics.silhouette_score {
            let quality = if score >= STRONG_SILHOUETTE {
                "strong"
            } else if score >= self.config.weak_silhouette {
                "reasonable"
            } else {
                "weak"
            };
            insights.push(Insight {
                kind: InsightKind::Quality,
                title: "Cluster Separation".to_string(),
                description: format!(
                    "Silhouette score {:.2} indicates {} separation between groups",
                    score, quality
                ),
            });
        }

        let mut overview = format!(
            "Analyzed {} {} and identified {} distinct patterns.",
            self.total,
            plural,
            self.summaries.len()
        );
        if self.noise_count > 0 {
            overview.push_str(&format!(
                " {} {} did not fit any pattern.",
                self.noise_count, plural
            ));
        }

        ExecutiveSummary {
            title: format!("Analysis: {}", self.dataset_name),
            overview,
            insights,
            recommendations: self.recommendations(critical_count, largest),
        }
    }

    fn recommendations(&self, critical_count: usize, largest: Option<&ClusterSummary>) -> Vec<String> {
        let plural = &self.terms.plural;
        let mut out = Vec::new();

        if critical_count > 0 {
            out.push(format!(
                "Prioritize investigation of {} critical {} - these represent the highest risk",
                critical_count, plural
            ));
        }
        if let Some(largest) = largest.filter(|l| l.percentage > self.config.focus_cluster_pct) {
            out.push(format!(
                "Focus on the largest cluster(s) - addressing root causes here could resolve {:.1}% of {}. {}",
                largest.percentage, plural, largest.description
            ));
        }
        if self.noise_count > 0 {
            out.push(format!(
                "Review unique {} individually - they may indicate distinct patterns or outliers",
                plural
            ));
        }
        if let Some(score) = self
            .metrics
            .silhouette_score
            .filter(|s| *s < self.config.weak_silhouette)
        {
            out.push(format!(
                "Cluster separation is weak (silhouette {:.2}) - confirm the groups with a different algorithm or parameters before acting on them",
                score
            ));
        }

        if out.is_empty() {
            out.push(
                "Data is well-distributed across patterns - consider investigating each cluster systematically"
                    .to_string(),
            );
        }
        if out.len() < MIN_RECOMMENDATIONS {
            out.push(format!(
                "Compare example {} from each cluster to name the patterns that were found",
                plural
            ));
        }
        out.truncate(MAX_RECOMMENDATIONS);
        out
    }
}

/// Summary for a run that did not separate the data into at least two groups
pub(crate) fn inconclusive(dataset_name: &str, terms: &Terminology, total: usize) -> ExecutiveSummary {
    let plural = &terms.plural;
    ExecutiveSummary {
        title: format!("Inconclusive analysis: {}", dataset_name),
        overview: format!(
            "Analyzed {} {} but clustering did not separate them into at least two distinct patterns, so no insights are drawn.",
            total, plural
        ),
        insights: vec![Insight {
            kind: InsightKind::Info,
            title: "Low Confidence Result".to_string(),
            description: format!(
                "The {} look alike under the selected features, or too few of them formed groups.",
                plural
            ),
        }],
        recommendations: vec![
            "Try a different algorithm or parameters, for example a smaller minimum cluster size".to_string(),
            format!(
                "Check that the dataset contains attributes that vary between {}",
                plural
            ),
        ],
    }
}
