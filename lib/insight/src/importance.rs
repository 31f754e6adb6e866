//! Rule-based priority tiers for clusters

use crate::config::InsightConfig;
use crate::terminology::{capitalize, Terminology};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn is_headline(&self) -> bool {
        *self >= Priority::High
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    Size,
    Severity,
    Pattern,
    Homogeneity,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportanceReason {
    pub kind: ReasonKind,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Importance {
    pub priority: Priority,
    pub reasons: Vec<ImportanceReason>,
    pub summary: String,
}

/// Facts about one cluster that drive its priority
#[derive(Debug, Clone, Default)]
pub struct ClusterSignals<'a> {
    pub size: usize,
    /// Share of all records, in percent
    pub percentage: f64,
    /// Most common value of the severity column
    pub severity: Option<&'a str>,
    /// Most common code and its share of the cluster in percent
    pub code: Option<(&'a str, f64)>,
    /// Mean ratio of within-cluster to overall spread
    pub homogeneity: Option<f64>,
}

pub fn assess(signals: &ClusterSignals<'_>, config: &InsightConfig, terms: &Terminology) -> Importance {
    let pct = signals.percentage;
    let plural = &terms.plural;
    let mut reasons = Vec::new();
    let mut priority = Priority::Medium;

    if pct > config.large_cluster_pct {
        reasons.push(reason(
            ReasonKind::Size,
            "Large Cluster",
            format!(
                "This cluster represents {:.1}% of all {}, making it a high-priority issue.",
                pct, plural
            ),
        ));
        priority = Priority::High;
    } else if pct > config.significant_cluster_pct {
        reasons.push(reason(
            ReasonKind::Size,
            "Significant Cluster",
            format!(
                "This cluster represents {:.1}% of {}, indicating a recurring pattern.",
                pct, plural
            ),
        ));
    } else if pct < config.small_cluster_pct {
        reasons.push(reason(
            ReasonKind::Size,
            "Niche Group",
            format!(
                "Only {:.1}% of {} fall in this cluster; it may be a niche segment or an emerging pattern.",
                pct, plural
            ),
        ));
        priority = Priority::Low;
    }

    match signals.severity.map(str::to_lowercase).as_deref() {
        Some("critical") => {
            reasons.push(reason(
                ReasonKind::Severity,
                "Critical Severity",
                format!(
                    "Most {} in this cluster are marked as Critical, requiring immediate attention.",
                    plural
                ),
            ));
            priority = Priority::Critical;
        }
        Some("warning") => reasons.push(reason(
            ReasonKind::Severity,
            "Warning Severity",
            format!(
                "These {} indicate potential issues that should be monitored.",
                plural
            ),
        )),
        _ => {}
    }

    if let Some((code, share)) = signals.code {
        if share > config.consistent_pattern_pct {
            reasons.push(reason(
                ReasonKind::Pattern,
                &format!("Consistent {} Pattern", capitalize(&terms.singular)),
                format!(
                    "{:.0}% of {} share the same code ({}), suggesting a systemic issue.",
                    share, plural, code
                ),
            ));
        }
    }

    if let Some(ratio) = signals.homogeneity {
        if signals.size > 1 && ratio < config.homogeneity_ratio {
            reasons.push(reason(
                ReasonKind::Homogeneity,
                "Homogeneous Group",
                format!(
                    "Members vary only {:.0}% as much as the dataset overall, so they can likely be handled together.",
                    ratio * 100.0
                ),
            ));
        }
    }

    if reasons.is_empty() {
        reasons.push(reason(
            ReasonKind::General,
            "Pattern Identified",
            format!(
                "This cluster represents a distinct pattern of {} that may share common root causes.",
                plural
            ),
        ));
    }

    Importance {
        priority,
        reasons,
        summary: format!(
            "This cluster contains {} {} ({:.1}% of total) with similar characteristics.",
            signals.size, plural, pct
        ),
    }
}

fn reason(kind: ReasonKind, title: &str, description: String) -> ImportanceReason {
    ImportanceReason {
        kind,
        title: title.to_string(),
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminology::DataDomain;

    fn titles(importance: &Importance) -> Vec<&str> {
        importance.reasons.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_large_cluster_is_high() {
        let signals = ClusterSignals {
            size: 40,
            percentage: 40.0,
            ..Default::default()
        };
        let importance = assess(&signals, &InsightConfig::default(), &DataDomain::Generic.terminology());
        assert_eq!(importance.priority, Priority::High);
        assert_eq!(titles(&importance), vec!["Large Cluster"]);
        assert!(importance.summary.contains("40 records (40.0% of total)"));
    }

    #[test]
    fn test_critical_severity_and_code_pattern() {
        let signals = ClusterSignals {
            size: 12,
            percentage: 12.0,
            severity: Some("Critical"),
            code: Some(("F0283", 91.0)),
            homogeneity: None,
        };
        let importance = assess(&signals, &InsightConfig::default(), &DataDomain::Alarm.terminology());
        assert_eq!(importance.priority, Priority::Critical);
        assert_eq!(
            titles(&importance),
            vec!["Significant Cluster", "Critical Severity", "Consistent Alarm Pattern"]
        );
    }

    #[test]
    fn test_warning_adds_reason_only() {
        let signals = ClusterSignals {
            size: 8,
            percentage: 8.0,
            severity: Some("warning"),
            ..Default::default()
        };
        let importance = assess(&signals, &InsightConfig::default(), &DataDomain::Alarm.terminology());
        assert_eq!(importance.priority, Priority::Medium);
        assert_eq!(titles(&importance), vec!["Warning Severity"]);
    }

    #[test]
    fn test_niche_and_default_reason() {
        let config = InsightConfig::default();
        let terms = DataDomain::Generic.terminology();
        let niche = assess(
            &ClusterSignals {
                size: 2,
                percentage: 2.0,
                ..Default::default()
            },
            &config,
            &terms,
        );
        assert_eq!(niche.priority, Priority::Low);

        let plain = assess(
            &ClusterSignals {
                size: 7,
                percentage: 7.0,
                homogeneity: Some(0.9),
                ..Default::default()
            },
            &config,
            &terms,
        );
        assert_eq!(titles(&plain), vec!["Pattern Identified"]);
    }

    #[test]
    fn test_homogeneous_group() {
        let importance = assess(
            &ClusterSignals {
                size: 20,
                percentage: 20.0,
                homogeneity: Some(0.2),
                ..Default::default()
            },
            &InsightConfig::default(),
            &DataDomain::Customer.terminology(),
        );
        assert!(titles(&importance).contains(&"Homogeneous Group"));
        assert!(Priority::Critical.is_headline());
        assert!(!Priority::Medium.is_headline());
    }
}
