//! Report of the features a run clustered on

use clustx_core::Dataset;
use clustx_features::{ColumnKind, Encoding, PreprocessReport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDetail {
    pub name: String,
    pub kind: ColumnKind,
    pub distinct_values: usize,
    pub missing_count: usize,
    pub is_categorical: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataShape {
    pub rows: usize,
    pub columns: usize,
    pub processed_rows: usize,
    pub processed_features: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessingInfo {
    pub algorithm: String,
    pub scaling: String,
    pub encoding: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureReport {
    pub total_features: usize,
    pub feature_names: Vec<String>,
    pub feature_details: Vec<FeatureDetail>,
    pub data_shape: DataShape,
    pub preprocessing_info: PreprocessingInfo,
}

impl FeatureReport {
    pub fn new(dataset: &Dataset, report: &PreprocessReport, algorithm: &str) -> Self {
        let feature_details: Vec<FeatureDetail> = report
            .feature_names
            .iter()
            .filter_map(|name| report.columns.iter().find(|c| &c.name == name))
            .map(|profile| FeatureDetail {
                name: profile.name.clone(),
                kind: profile.kind.clone(),
                distinct_values: profile.distinct_values,
                missing_count: profile.missing_count,
                is_categorical: report.encoding == Encoding::CategoricalCodes,
            })
            .collect();

        Self {
            total_features: report.feature_names.len(),
            feature_names: report.feature_names.clone(),
            feature_details,
            data_shape: DataShape {
                rows: dataset.n_rows(),
                columns: dataset.n_columns(),
                processed_rows: report.rows_after,
                processed_features: report.feature_names.len(),
            },
            preprocessing_info: PreprocessingInfo {
                algorithm: algorithm.to_string(),
                scaling: "Standardized (mean=0, std=1)".to_string(),
                encoding: report.encoding.description().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustx_core::Value;
    use clustx_features::prepare_features;

    #[test]
    fn test_numeric_report() {
        let dataset = Dataset::from_records(vec![
            vec![("a", Value::Number(1.0)), ("b", Value::Number(3.0)), ("c", Value::Number(5.0))],
            vec![("a", Value::Number(2.0)), ("b", Value::Missing), ("c", Value::Number(5.0))],
            vec![("a", Value::Number(3.0)), ("b", Value::Number(1.0)), ("c", Value::Number(5.0))],
        ]);
        let prepared = prepare_features(&dataset).unwrap();
        let report = FeatureReport::new(&dataset, &prepared.report, "K-Means");

        assert_eq!(report.feature_names, vec!["a", "b"]);
        assert_eq!(report.total_features, 2);
        assert_eq!(report.feature_details[1].missing_count, 1);
        assert!(!report.feature_details[0].is_categorical);
        assert_eq!(report.data_shape.rows, 3);
        assert_eq!(report.data_shape.columns, 3);
        assert_eq!(report.data_shape.processed_rows, 2);
        assert_eq!(report.preprocessing_info.encoding, "None (numeric features only)");
    }

    #[test]
    fn test_categorical_report() {
        let dataset = Dataset::from_records(vec![
            vec![("kind", Value::from("a"))],
            vec![("kind", Value::from("b"))],
        ]);
        let prepared = prepare_features(&dataset).unwrap();
        let report = FeatureReport::new(&dataset, &prepared.report, "K-Means");
        assert!(report.feature_details[0].is_categorical);
        assert_eq!(
            report.preprocessing_info.encoding,
            "Label encoding for categorical features"
        );
    }
}
