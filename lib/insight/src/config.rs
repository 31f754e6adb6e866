use clustx_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Thresholds used when turning clusters into narratives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Share of records (percent) above which a cluster is large and high priority
    pub large_cluster_pct: f64,
    /// Share above which a cluster is a significant recurring pattern
    pub significant_cluster_pct: f64,
    /// Share below which a cluster is a niche group
    pub small_cluster_pct: f64,
    /// Share of the largest cluster that earns a "focus here" recommendation
    pub focus_cluster_pct: f64,
    /// Share of one code inside a cluster that makes a consistent pattern
    pub consistent_pattern_pct: f64,
    /// Share of one category that makes it representative of a cluster
    pub dominant_value_pct: f64,
    /// Mean ratio of cluster to overall spread below which a cluster is homogeneous
    pub homogeneity_ratio: f64,
    /// Silhouette below which separation is called weak
    pub weak_silhouette: f64,
    /// Example records kept per cluster summary and noise explanation
    pub example_records: usize,
    /// Entries kept in the noise code distribution
    pub code_distribution_top: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            large_cluster_pct: 30.0,
            significant_cluster_pct: 10.0,
            small_cluster_pct: 5.0,
            focus_cluster_pct: 20.0,
            consistent_pattern_pct: 80.0,
            dominant_value_pct: 60.0,
            homogeneity_ratio: 0.5,
            weak_silhouette: 0.25,
            example_records: 5,
            code_distribution_top: 10,
        }
    }
}

impl InsightConfig {
    pub fn validate(&self) -> Result<()> {
        let percentages = [
            ("large_cluster_pct", self.large_cluster_pct),
            ("significant_cluster_pct", self.significant_cluster_pct),
            ("small_cluster_pct", self.small_cluster_pct),
            ("focus_cluster_pct", self.focus_cluster_pct),
            ("consistent_pattern_pct", self.consistent_pattern_pct),
            ("dominant_value_pct", self.dominant_value_pct),
        ];
        for (name, value) in percentages {
            if !(0.0..=100.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be within 0..=100, got {}",
                    name, value
                )));
            }
        }
        if self.small_cluster_pct > self.significant_cluster_pct
            || self.significant_cluster_pct > self.large_cluster_pct
        {
            return Err(Error::InvalidConfig(
                "cluster size thresholds must ascend small < significant < large".to_string(),
            ));
        }
        if !(self.homogeneity_ratio.is_finite() && self.homogeneity_ratio > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "homogeneity_ratio must be positive, got {}",
                self.homogeneity_ratio
            )));
        }
        if !(-1.0..=1.0).contains(&self.weak_silhouette) {
            return Err(Error::InvalidConfig(format!(
                "weak_silhouette must be within -1..=1, got {}",
                self.weak_silhouette
            )));
        }
        Ok(())
    }
}
