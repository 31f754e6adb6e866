//! Explanations for records no cluster claimed

use crate::record::{extract_records, RecordDetails};
use crate::summary::{round1, DatasetContext};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseExplanation {
    pub count: usize,
    /// Share of all clustered records, in percent
    pub percentage: f64,
    /// Column used for the code distribution, if the dataset has one
    pub code_column: Option<String>,
    pub unique_codes: usize,
    /// Most frequent codes first
    pub code_distribution: Vec<CodeCount>,
    pub records: Vec<RecordDetails>,
    pub title: String,
    pub description: String,
    /// Reasons drawn from the data first, then general ones
    pub reasons: Vec<String>,
    pub recommendation: String,
}

impl DatasetContext<'_> {
    /// Explain the noise rows. `record_limit` caps the listed records.
    pub fn explain_noise(
        &self,
        noise_rows: &[usize],
        clustered_rows: &[usize],
        total: usize,
        record_limit: Option<usize>,
    ) -> NoiseExplanation {
        let count = noise_rows.len();
        let plural = &self.terms.plural;
        let items = &self.terms.items;

        let (code_column, unique_codes, code_distribution) = match self.code_column {
            Some(col) => {
                let (unique, distribution) = self.code_distribution(col, noise_rows);
                (Some(self.column_name(col).to_string()), unique, distribution)
            }
            None => (None, 0, Vec::new()),
        };

        let mut reasons = Vec::new();
        if let Some((column, outside)) = self.out_of_range(noise_rows, clustered_rows) {
            reasons.push(format!(
                "{} of {} {} have values outside the range seen in any cluster (most often {})",
                outside, count, plural, column
            ));
        }
        if let Some(column) = &code_column {
            if unique_codes > 1 && unique_codes * 2 >= count {
                reasons.push(format!(
                    "Mixed characteristics: {} different {} values across {} {}",
                    unique_codes, column, count, plural
                ));
            }
        }
        reasons.push(format!(
            "Low-density regions where too few similar {} exist to form a group",
            plural
        ));
        reasons.push(format!(
            "Rare or one-off {} that don't follow common patterns",
            plural
        ));
        reasons.push(format!(
            "{} with unique combinations of features that differ significantly from clustered {}",
            self.terms.plural_capitalized(),
            plural
        ));
        reasons.push("Potential new or emerging patterns that haven't formed yet".to_string());
        reasons.push("Edge cases or outliers that require individual investigation".to_string());

        let listed: Vec<usize> = match record_limit {
            Some(limit) => noise_rows.iter().copied().take(limit).collect(),
            None => noise_rows.to_vec(),
        };

        NoiseExplanation {
            count,
            percentage: round1(100.0 * count as f64 / total.max(1) as f64),
            code_column,
            unique_codes,
            code_distribution,
            records: extract_records(self.dataset, &listed),
            title: "Why These Are Unique Cases".to_string(),
            description: format!(
                "These {} {} don't fit into any major cluster pattern. They may represent:",
                count, items
            ),
            reasons,
            recommendation: format!(
                "Review these {} individually to identify if they represent new patterns or require special attention.",
                items
            ),
        }
    }

    fn code_distribution(&self, col: usize, rows: &[usize]) -> (usize, Vec<CodeCount>) {
        let mut counts: AHashMap<String, usize> = AHashMap::new();
        for value in rows
            .iter()
            .filter_map(|&r| self.dataset.row(r))
            .filter_map(|r| r.value(col).display_string())
        {
            *counts.entry(value).or_insert(0) += 1;
        }
        let unique = counts.len();
        let mut distribution: Vec<CodeCount> = counts
            .into_iter()
            .map(|(value, count)| CodeCount { value, count })
            .collect();
        distribution.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        distribution.truncate(self.config.code_distribution_top);
        (unique, distribution)
    }

    /// Number of noise rows with a numeric value outside every clustered
    /// value of that column, and the column where this happens most
    fn out_of_range(&self, noise_rows: &[usize], clustered_rows: &[usize]) -> Option<(String, usize)> {
        let value_at = |row: usize, col: usize| self.dataset.row(row).and_then(|r| r.value(col).as_f64());

        let mut per_column: Vec<(usize, usize)> = Vec::new();
        let mut flagged = vec![false; noise_rows.len()];
        for col in self.numeric_columns() {
            let (min, max) = clustered_rows
                .iter()
                .filter_map(|&r| value_at(r, col))
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            if min > max {
                continue;
            }
            let mut outside = 0;
            for (flag, &row) in flagged.iter_mut().zip(noise_rows) {
                if let Some(v) = value_at(row, col) {
                    if v < min || v > max {
                        outside += 1;
                        *flag = true;
                    }
                }
            }
            per_column.push((col, outside));
        }

        let total_flagged = flagged.iter().filter(|&&f| f).count();
        let (col, _) = per_column
            .into_iter()
            .filter(|(_, outside)| *outside > 0)
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))?;
        Some((self.column_name(col).to_string(), total_flagged))
    }
}
