//! Feature Preprocessor
//!
//! Turns a [`Dataset`] into a standardized [`FeatureMatrix`]:
//!
//! 1. Numeric columns with more than one distinct value form the feature set.
//!    Rows missing any of them are dropped.
//! 2. Without numeric features, categorical columns are integer-coded
//!    (codes follow first appearance, missing values share a placeholder).
//! 3. Every retained column is scaled to zero mean and unit variance
//!    (population variance). Columns that end up constant are dropped.

use crate::column::{classify_columns, ColumnProfile};
use ahash::AHashMap;
use clustx_core::{Dataset, Error, FeatureMatrix, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Category substituted for missing values before categorical encoding
pub const MISSING_PLACEHOLDER: &str = "__MISSING__";

/// Standard deviation below which a column counts as constant
const MIN_STD: f64 = 1e-12;

/// How source columns were turned into numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Numeric,
    CategoricalCodes,
}

impl Encoding {
    /// How categorical values were turned into numbers
    pub fn description(&self) -> &'static str {
        match self {
            Encoding::Numeric => "None (numeric features only)",
            Encoding::CategoricalCodes => "Label encoding for categorical features",
        }
    }
}

/// Integer codes of one categorical column; a category's code is its position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCodes {
    pub column: String,
    pub categories: Vec<String>,
}

impl CategoryCodes {
    pub fn code_of(&self, category: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == category)
    }
}

/// What the preprocessor did to the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessReport {
    pub encoding: Encoding,
    /// Classification of every source column
    pub columns: Vec<ColumnProfile>,
    /// Names of the matrix columns, in order
    pub feature_names: Vec<String>,
    pub rows_before: usize,
    pub rows_after: usize,
    /// Candidate columns dropped because they were constant over the retained rows
    pub dropped_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_codes: Vec<CategoryCodes>,
    /// Per-feature mean before scaling
    pub means: Vec<f64>,
    /// Per-feature standard deviation before scaling
    pub scales: Vec<f64>,
}

impl PreprocessReport {
    #[inline]
    pub fn rows_dropped(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

/// Output of [`FeaturePreprocessor::fit_transform`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedFeatures {
    pub matrix: FeatureMatrix,
    pub report: PreprocessReport,
}

#[derive(Debug, Clone)]
pub struct FeaturePreprocessor {
    missing_placeholder: String,
}

impl Default for FeaturePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeaturePreprocessor {
    pub fn new() -> Self {
        Self {
            missing_placeholder: MISSING_PLACEHOLDER.to_string(),
        }
    }

    #[must_use]
    pub fn with_missing_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.missing_placeholder = placeholder.into();
        self
    }

    /// Build the standardized feature matrix for `dataset`.
    ///
    /// Fails with [`Error::EmptyDataset`] on an empty dataset and with
    /// [`Error::InsufficientFeatures`] when no usable column exists.
    pub fn fit_transform(&self, dataset: &Dataset) -> Result<PreparedFeatures> {
        if dataset.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let profiles = classify_columns(dataset);
        let numeric: Vec<usize> = profiles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind.is_numeric())
            .map(|(i, _)| i)
            .collect();

        let (encoding, candidates, raw_columns, record_index, category_codes) = if !numeric.is_empty() {
            let (raw, rows) = numeric_columns(dataset, &numeric);
            (Encoding::Numeric, numeric, raw, rows, Vec::new())
        } else {
            let categorical: Vec<usize> = profiles
                .iter()
                .enumerate()
                .filter(|(_, p)| p.kind.is_categorical())
                .map(|(i, _)| i)
                .collect();
            if categorical.is_empty() {
                return Err(Error::InsufficientFeatures(
                    "no numeric or categorical features available".to_string(),
                ));
            }
            let (raw, codes) = self.categorical_columns(dataset, &categorical);
            let rows = (0..dataset.n_rows()).collect();
            (Encoding::CategoricalCodes, categorical, raw, rows, codes)
        };

        let n_rows = record_index.len();
        if n_rows == 0 {
            return Err(Error::InsufficientSamples {
                required: 1,
                actual: 0,
            });
        }

        let mut kept: Vec<(usize, Vec<f64>, f64, f64)> = Vec::with_capacity(candidates.len());
        let mut dropped_columns = Vec::new();
        for (col, values) in candidates.iter().copied().zip(raw_columns) {
            let (mean, std) = mean_std(&values);
            if std <= MIN_STD * (1.0 + mean.abs()) {
                dropped_columns.push(dataset.columns()[col].clone());
                continue;
            }
            kept.push((col, values, mean, std));
        }

        if kept.is_empty() {
            return Err(Error::InsufficientFeatures(
                "every candidate feature is constant over the retained rows".to_string(),
            ));
        }
        if !dropped_columns.is_empty() {
            warn!("Dropped constant columns after row filtering: {:?}", dropped_columns);
        }

        let n_features = kept.len();
        let mut data = vec![0.0; n_rows * n_features];
        for (j, (_, values, mean, std)) in kept.iter().enumerate() {
            for (i, v) in values.iter().enumerate() {
                data[i * n_features + j] = (v - mean) / std;
            }
        }

        let feature_names: Vec<String> = kept
            .iter()
            .map(|(col, ..)| dataset.columns()[*col].clone())
            .collect();
        let means = kept.iter().map(|(_, _, m, _)| *m).collect();
        let scales = kept.iter().map(|(_, _, _, s)| *s).collect();
        let category_codes = category_codes
            .into_iter()
            .filter(|c: &CategoryCodes| feature_names.contains(&c.column))
            .collect();

        let matrix = FeatureMatrix::new(data, n_features, feature_names.clone(), record_index)?;

        info!(
            "Prepared {} x {} feature matrix ({:?}, {} rows dropped)",
            matrix.n_rows(),
            matrix.n_features(),
            encoding,
            dataset.n_rows() - n_rows
        );

        Ok(PreparedFeatures {
            matrix,
            report: PreprocessReport {
                encoding,
                columns: profiles,
                feature_names,
                rows_before: dataset.n_rows(),
                rows_after: n_rows,
                dropped_columns,
                category_codes,
                means,
                scales,
            },
        })
    }

    fn categorical_columns(
        &self,
        dataset: &Dataset,
        columns: &[usize],
    ) -> (Vec<Vec<f64>>, Vec<CategoryCodes>) {
        let mut raw = Vec::with_capacity(columns.len());
        let mut codes = Vec::with_capacity(columns.len());

        for &col in columns {
            let mut lookup: AHashMap<String, usize> = AHashMap::new();
            let mut categories: Vec<String> = Vec::new();
            let values: Vec<f64> = dataset
                .column_values(col)
                .map(|value| {
                    let key = value
                        .display_string()
                        .unwrap_or_else(|| self.missing_placeholder.clone());
                    let code = *lookup.entry(key.clone()).or_insert_with(|| {
                        categories.push(key);
                        categories.len() - 1
                    });
                    code as f64
                })
                .collect();
            debug!(
                "Encoded column '{}' into {} categories",
                dataset.columns()[col],
                categories.len()
            );
            raw.push(values);
            codes.push(CategoryCodes {
                column: dataset.columns()[col].clone(),
                categories,
            });
        }

        (raw, codes)
    }
}

/// Column-major values of the numeric columns over the rows where all of them are present
fn numeric_columns(dataset: &Dataset, columns: &[usize]) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut raw: Vec<Vec<f64>> = vec![Vec::with_capacity(dataset.n_rows()); columns.len()];
    let mut rows = Vec::with_capacity(dataset.n_rows());

    for record in dataset.records() {
        let values: Option<Vec<f64>> = columns
            .iter()
            .map(|&col| record.value(col).as_f64())
            .collect();
        if let Some(values) = values {
            for (column, v) in raw.iter_mut().zip(values) {
                column.push(v);
            }
            rows.push(record.index());
        }
    }

    let dropped = dataset.n_rows() - rows.len();
    if dropped > 0 {
        debug!("Dropped {} rows with missing numeric values", dropped);
    }
    (raw, rows)
}

/// Mean and population standard deviation
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Convenience wrapper over [`FeaturePreprocessor::fit_transform`] with defaults
pub fn prepare_features(dataset: &Dataset) -> Result<PreparedFeatures> {
    FeaturePreprocessor::new().fit_transform(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustx_core::Value;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numeric_standardization() {
        let dataset = Dataset::new(
            cols(&["a", "b"]),
            vec![
                vec![Value::Number(1.0), Value::Number(10.0)],
                vec![Value::Number(2.0), Value::Number(20.0)],
                vec![Value::Number(3.0), Value::Number(60.0)],
            ],
        )
        .unwrap();

        let prepared = prepare_features(&dataset).unwrap();
        let m = &prepared.matrix;
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.n_features(), 2);
        for j in 0..2 {
            let col = m.column(j);
            let mean: f64 = col.iter().sum::<f64>() / 3.0;
            let var: f64 = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-9);
        }
        assert_eq!(prepared.report.encoding, Encoding::Numeric);
        assert_eq!(prepared.report.feature_names, cols(&["a", "b"]));
    }

    #[test]
    fn test_constant_column_is_skipped() {
        let dataset = Dataset::new(
            cols(&["flat", "x"]),
            vec![
                vec![Value::Number(5.0), Value::Number(1.0)],
                vec![Value::Number(5.0), Value::Number(2.0)],
                vec![Value::Number(5.0), Value::Number(4.0)],
            ],
        )
        .unwrap();

        let prepared = prepare_features(&dataset).unwrap();
        assert_eq!(prepared.matrix.feature_names(), &["x".to_string()]);
    }

    #[test]
    fn test_all_constant_without_categorical_fails() {
        let dataset = Dataset::new(
            cols(&["a", "b"]),
            vec![
                vec![Value::Number(5.0), Value::Number(1.0)],
                vec![Value::Number(5.0), Value::Number(1.0)],
            ],
        )
        .unwrap();

        let result = prepare_features(&dataset);
        assert!(matches!(result, Err(Error::InsufficientFeatures(_))));
    }

    #[test]
    fn test_rows_with_missing_numeric_values_are_dropped() {
        let dataset = Dataset::new(
            cols(&["a", "b"]),
            vec![
                vec![Value::Number(1.0), Value::Number(1.0)],
                vec![Value::Missing, Value::Number(2.0)],
                vec![Value::Number(3.0), Value::Number(3.0)],
                vec![Value::Number(4.0), Value::Number(7.0)],
            ],
        )
        .unwrap();

        let prepared = prepare_features(&dataset).unwrap();
        assert_eq!(prepared.matrix.record_index(), &[0, 2, 3]);
        assert_eq!(prepared.report.rows_dropped(), 1);
    }

    #[test]
    fn test_column_constant_after_row_drop_is_removed() {
        let dataset = Dataset::new(
            cols(&["a", "b"]),
            vec![
                vec![Value::Number(1.0), Value::Number(9.0)],
                vec![Value::Missing, Value::Number(2.0)],
                vec![Value::Number(3.0), Value::Number(9.0)],
            ],
        )
        .unwrap();

        let prepared = prepare_features(&dataset).unwrap();
        assert_eq!(prepared.matrix.feature_names(), &["a".to_string()]);
        assert_eq!(prepared.report.dropped_columns, cols(&["b"]));
    }

    #[test]
    fn test_categorical_fallback_codes_by_first_appearance() {
        let dataset = Dataset::new(
            cols(&["code", "site", "flat"]),
            vec![
                vec!["B".into(), "x".into(), Value::Number(1.0)],
                vec!["A".into(), Value::Missing, Value::Number(1.0)],
                vec!["B".into(), "x".into(), Value::Number(1.0)],
                vec!["C".into(), "y".into(), Value::Number(1.0)],
            ],
        )
        .unwrap();

        let prepared = prepare_features(&dataset).unwrap();
        let report = &prepared.report;
        assert_eq!(report.encoding, Encoding::CategoricalCodes);
        assert_eq!(report.feature_names, cols(&["code", "site"]));
        assert_eq!(report.category_codes[0].categories, cols(&["B", "A", "C"]));
        assert_eq!(
            report.category_codes[1].categories,
            cols(&["x", MISSING_PLACEHOLDER, "y"])
        );
        assert_eq!(prepared.matrix.n_rows(), 4);
        // rows 0 and 2 share every category
        assert_eq!(prepared.matrix.row(0), prepared.matrix.row(2));
    }

    #[test]
    fn test_no_usable_columns() {
        let dataset = Dataset::new(
            cols(&["only"]),
            vec![vec!["same".into()], vec!["same".into()]],
        )
        .unwrap();
        let result = prepare_features(&dataset);
        assert!(matches!(result, Err(Error::InsufficientFeatures(_))));
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = Dataset::new(cols(&["a"]), vec![]).unwrap();
        assert!(matches!(prepare_features(&dataset), Err(Error::EmptyDataset)));
    }

    #[test]
    fn test_deterministic() {
        let dataset = Dataset::new(
            cols(&["a", "kind"]),
            vec![
                vec![Value::Number(0.5), "p".into()],
                vec![Value::Number(1.5), "q".into()],
                vec![Value::Number(9.0), "p".into()],
            ],
        )
        .unwrap();
        let first = prepare_features(&dataset).unwrap();
        let second = prepare_features(&dataset).unwrap();
        assert_eq!(first, second);
    }
}
