//! Per-cluster summaries
//!
//! Every usable column is profiled inside the cluster: numeric columns by
//! mean and range against the whole dataset, categorical columns by their
//! most common value. Descriptions are assembled from the most distinctive
//! of those profiles.

use crate::config::InsightConfig;
use crate::importance::{assess, ClusterSignals, Importance};
use crate::record::{extract_records, RecordDetails};
use crate::terminology::{DataDomain, Terminology};
use ahash::AHashMap;
use clustx_core::{Dataset, Value};
use clustx_features::{classify_columns, ColumnKind};
use serde::{Deserialize, Serialize};

const SEVERITY_COLUMNS: &[&str] = &["OrigSeverity", "severity", "priority", "importance"];
const CODE_COLUMNS: &[&str] = &["Code", "AlarmCode", "attack_type", "attack", "type", "category"];
const OBJECT_TYPE_COLUMNS: &[&str] = &["AffectedMoType", "object_type"];

/// Standardized mean difference that makes a numeric feature distinctive
const DISTINCTIVE_Z: f64 = 0.5;
const MAX_DESCRIPTION_PARTS: usize = 3;
const MAX_KEY_ATTRIBUTES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureStat {
    Numeric {
        mean: f64,
        min: f64,
        max: f64,
        std: f64,
        /// Mean across the whole dataset
        overall_mean: f64,
        overall_std: f64,
    },
    Categorical {
        /// Most common value
        value: String,
        count: usize,
        /// Share of cluster members with `value`, in percent
        percentage: f64,
        distinct: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProfile {
    pub column: String,
    pub stat: FeatureStat,
}

impl FeatureProfile {
    /// Standardized distance of the cluster mean from the dataset mean
    pub fn z_score(&self) -> Option<f64> {
        match self.stat {
            FeatureStat::Numeric {
                mean,
                overall_mean,
                overall_std,
                ..
            } if overall_std > 0.0 => Some((mean - overall_mean) / overall_std),
            _ => None,
        }
    }

    fn mode(&self) -> Option<(&str, f64)> {
        match &self.stat {
            FeatureStat::Categorical {
                value, percentage, ..
            } => Some((value.as_str(), *percentage)),
            FeatureStat::Numeric { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id: i32,
    pub size: usize,
    /// Share of all clustered records, in percent, one decimal
    pub percentage: f64,
    pub characteristics: Vec<FeatureProfile>,
    pub description: String,
    pub key_attributes: Vec<String>,
    /// Mean ratio of within-cluster to overall standard deviation over numeric columns
    pub homogeneity: Option<f64>,
    pub importance: Importance,
    pub examples: Vec<RecordDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Spread {
    mean: f64,
    std: f64,
}

/// Dataset facts shared by every cluster of one analysis
pub(crate) struct DatasetContext<'a> {
    pub dataset: &'a Dataset,
    pub config: &'a InsightConfig,
    pub domain: DataDomain,
    pub terms: Terminology,
    /// Profiled columns with their kind; all-missing columns are skipped
    columns: Vec<(usize, bool)>,
    overall: AHashMap<usize, Spread>,
    pub severity_column: Option<usize>,
    pub code_column: Option<usize>,
    object_type_column: Option<usize>,
}

impl<'a> DatasetContext<'a> {
    pub fn new(dataset: &'a Dataset, config: &'a InsightConfig) -> Self {
        let domain = DataDomain::detect(dataset);
        let profiles = classify_columns(dataset);

        let mut columns = Vec::new();
        let mut overall = AHashMap::new();
        for (col, profile) in profiles.iter().enumerate() {
            let numeric = match &profile.kind {
                ColumnKind::Numeric => true,
                ColumnKind::Categorical => false,
                ColumnKind::Unusable(_) if profile.missing_count == dataset.n_rows() => continue,
                ColumnKind::Unusable(_) => profile.numeric_typed,
            };
            if numeric {
                let values: Vec<f64> = dataset.column_values(col).filter_map(Value::as_f64).collect();
                overall.insert(col, spread(&values));
            }
            columns.push((col, numeric));
        }

        Self {
            dataset,
            config,
            domain,
            terms: domain.terminology(),
            columns,
            overall,
            severity_column: dataset.find_column(SEVERITY_COLUMNS),
            code_column: dataset.find_column(CODE_COLUMNS),
            object_type_column: dataset.find_column(OBJECT_TYPE_COLUMNS),
        }
    }

    pub fn column_name(&self, col: usize) -> &str {
        &self.dataset.columns()[col]
    }

    /// Numeric profiled columns
    pub fn numeric_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.iter().filter(|(_, numeric)| *numeric).map(|(col, _)| *col)
    }

    /// Summarize the cluster whose members sit at dataset rows `rows`
    pub fn summarize(&self, cluster_id: i32, rows: &[usize], total: usize) -> ClusterSummary {
        let size = rows.len();
        let percentage = round1(100.0 * size as f64 / total.max(1) as f64);

        let characteristics: Vec<FeatureProfile> = self
            .columns
            .iter()
            .filter_map(|&(col, numeric)| self.profile(col, numeric, rows))
            .collect();

        let homogeneity = if size > 1 {
            let ratios: Vec<f64> = characteristics
                .iter()
                .filter_map(|p| match p.stat {
                    FeatureStat::Numeric {
                        std, overall_std, ..
                    } if overall_std > 0.0 => Some(std / overall_std),
                    _ => None,
                })
                .collect();
            (!ratios.is_empty()).then(|| ratios.iter().sum::<f64>() / ratios.len() as f64)
        } else {
            None
        };

        let find = |col: Option<usize>| {
            col.and_then(|c| {
                let name = self.column_name(c);
                characteristics.iter().find(|p| p.column == name)
            })
        };
        let severity = find(self.severity_column).and_then(FeatureProfile::mode);
        let code = find(self.code_column).and_then(FeatureProfile::mode);
        let object_type = find(self.object_type_column).and_then(FeatureProfile::mode);

        let signals = ClusterSignals {
            size,
            percentage,
            severity: severity.map(|(v, _)| v),
            code,
            homogeneity,
        };
        let importance = assess(&signals, self.config, &self.terms);

        let (description, key_attributes) =
            self.describe(cluster_id, size, &characteristics, severity, code, object_type);
        let examples_rows: Vec<usize> = rows.iter().copied().take(self.config.example_records).collect();

        ClusterSummary {
            cluster_id,
            size,
            percentage,
            description,
            key_attributes,
            homogeneity,
            importance,
            examples: extract_records(self.dataset, &examples_rows),
            characteristics,
        }
    }

    fn profile(&self, col: usize, numeric: bool, rows: &[usize]) -> Option<FeatureProfile> {
        let values = rows.iter().filter_map(|&r| self.dataset.row(r)).map(|r| r.value(col));
        let stat = if numeric {
            let numbers: Vec<f64> = values.filter_map(Value::as_f64).collect();
            if numbers.is_empty() {
                return None;
            }
            let Spread { mean, std } = spread(&numbers);
            let overall = self.overall.get(&col).copied().unwrap_or(Spread { mean, std });
            FeatureStat::Numeric {
                mean,
                min: numbers.iter().copied().fold(f64::INFINITY, f64::min),
                max: numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                std,
                overall_mean: overall.mean,
                overall_std: overall.std,
            }
        } else {
            let mut counts: AHashMap<String, (usize, usize)> = AHashMap::new();
            let mut present = 0;
            for (order, value) in values.filter_map(Value::display_string).enumerate() {
                present += 1;
                counts.entry(value).or_insert((0, order)).0 += 1;
            }
            // ties go to the value seen first
            let (value, (count, _)) = counts
                .iter()
                .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
                .map(|(v, c)| (v.clone(), *c))?;
            FeatureStat::Categorical {
                value,
                count,
                percentage: round1(100.0 * count as f64 / present as f64),
                distinct: counts.len(),
            }
        };
        Some(FeatureProfile {
            column: self.column_name(col).to_string(),
            stat,
        })
    }

    fn describe(
        &self,
        cluster_id: i32,
        size: usize,
        characteristics: &[FeatureProfile],
        severity: Option<(&str, f64)>,
        code: Option<(&str, f64)>,
        object_type: Option<(&str, f64)>,
    ) -> (String, Vec<String>) {
        let mut parts = Vec::new();
        let mut attributes = Vec::new();

        if let Some((value, _)) = code {
            attributes.push(format!("Code: {}", value));
        }
        if let Some((value, _)) = severity {
            parts.push(format!("{} severity", value));
            attributes.push(format!("Severity: {}", value));
        }
        if let Some((value, _)) = code {
            if self.domain == DataDomain::Alarm {
                parts.push(format!("alarm code {}", value));
            } else {
                parts.push(format!("code {}", value));
            }
        }
        if let Some((value, _)) = object_type {
            let short = value.rsplit('.').next().unwrap_or(value);
            parts.push(format!("affecting {} objects", short));
            attributes.push(format!("Type: {}", short));
        }

        let special: Vec<&str> = [self.severity_column, self.code_column, self.object_type_column]
            .iter()
            .flatten()
            .map(|&c| self.column_name(c))
            .collect();

        // dominant categories of columns that actually vary across the dataset
        for profile in characteristics.iter().filter(|p| !special.contains(&p.column.as_str())) {
            if let FeatureStat::Categorical {
                value, percentage, distinct, ..
            } = &profile.stat
            {
                let varies = self
                    .dataset
                    .column_index(&profile.column)
                    .map(|c| {
                        let first = self.dataset.column_values(c).find(|v| !v.is_missing());
                        self.dataset
                            .column_values(c)
                            .any(|v| !v.is_missing() && Some(v) != first)
                    })
                    .unwrap_or(false);
                if varies && *percentage >= self.config.dominant_value_pct && *distinct < size.max(2) {
                    parts.push(format!("mostly {} {}", value, profile.column));
                    attributes.push(format!("{}: {}", profile.column, value));
                }
            }
        }

        let mut distinctive: Vec<(&FeatureProfile, f64)> = characteristics
            .iter()
            .filter_map(|p| p.z_score().map(|z| (p, z)))
            .filter(|(_, z)| z.abs() >= DISTINCTIVE_Z)
            .collect();
        distinctive.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        for (profile, z) in distinctive {
            if let FeatureStat::Numeric { mean, .. } = profile.stat {
                let direction = if z > 0.0 { "high" } else { "low" };
                parts.push(format!("{} {} (avg {:.2})", direction, profile.column, mean));
                attributes.push(format!("{}: {:.2} avg", profile.column, mean));
            }
        }

        parts.truncate(MAX_DESCRIPTION_PARTS);
        attributes.truncate(MAX_KEY_ATTRIBUTES);
        let head = format!("Cluster {}: {} {}", cluster_id, size, self.terms.plural);
        let description = if parts.is_empty() {
            head
        } else {
            format!("{} with {}", head, parts.join(", "))
        };
        (description, attributes)
    }
}

fn spread(values: &[f64]) -> Spread {
    if values.is_empty() {
        return Spread { mean: 0.0, std: 0.0 };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Spread {
        mean,
        std: var.sqrt(),
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
