use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Dense row-major numeric feature table.
///
/// One row per retained dataset record, one column per selected feature.
/// Built once per run and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    n_rows: usize,
    n_features: usize,
    feature_names: Vec<String>,
    /// Dataset row position of every matrix row
    record_index: Vec<usize>,
}

impl FeatureMatrix {
    pub fn new(
        data: Vec<f64>,
        n_features: usize,
        feature_names: Vec<String>,
        record_index: Vec<usize>,
    ) -> Result<Self> {
        if n_features == 0 {
            return Err(Error::InsufficientFeatures(
                "feature matrix has no columns".to_string(),
            ));
        }
        if data.len() % n_features != 0 {
            return Err(Error::InvalidConfig(format!(
                "matrix data length {} is not a multiple of {} features",
                data.len(),
                n_features
            )));
        }
        if feature_names.len() != n_features {
            return Err(Error::InvalidConfig(format!(
                "expected {} feature names, got {}",
                n_features,
                feature_names.len()
            )));
        }
        let n_rows = data.len() / n_features;
        if record_index.len() != n_rows {
            return Err(Error::InvalidConfig(format!(
                "record index has {} entries for {} rows",
                record_index.len(),
                n_rows
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidConfig(
                "feature matrix contains non-finite values".to_string(),
            ));
        }

        Ok(Self {
            data,
            n_rows,
            n_features,
            feature_names,
            record_index,
        })
    }

    /// Build from row vectors with generated feature names and an identity record index
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_features) {
            return Err(Error::RaggedRow {
                row: i,
                expected: n_features,
                actual: row.len(),
            });
        }
        let data: Vec<f64> = rows.iter().flatten().copied().collect();
        let names = (0..n_features).map(|i| format!("feature_{}", i)).collect();
        Self::new(data, n_features, names, (0..rows.len()).collect())
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.n_features;
        &self.data[start..start + self.n_features]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_features)
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows().map(|r| r[j]).collect()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn record_index(&self) -> &[usize] {
        &self.record_index
    }

    /// Per-feature mean
    pub fn column_means(&self) -> Vec<f64> {
        let mut means = vec![0.0; self.n_features];
        if self.n_rows == 0 {
            return means;
        }
        for row in self.rows() {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        let n = self.n_rows as f64;
        means.iter_mut().for_each(|m| *m /= n);
        means
    }

    /// Keep only the rows selected by `mask`, preserving order
    pub fn select_rows(&self, mask: &[bool]) -> Self {
        let mut data = Vec::new();
        let mut record_index = Vec::new();
        for (i, keep) in mask.iter().enumerate().take(self.n_rows) {
            if *keep {
                data.extend_from_slice(self.row(i));
                record_index.push(self.record_index[i]);
            }
        }
        Self {
            n_rows: record_index.len(),
            data,
            n_features: self.n_features,
            feature_names: self.feature_names.clone(),
            record_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_access() {
        let m = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.n_features(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.column(1), vec![2.0, 4.0, 6.0]);
        assert_eq!(m.column_means(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_rejects_mismatched_record_index() {
        let result = FeatureMatrix::new(vec![1.0, 2.0], 1, vec!["a".to_string()], vec![0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        let result = FeatureMatrix::from_rows(&[vec![f64::NAN]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_select_rows_keeps_record_index() {
        let m = FeatureMatrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let selected = m.select_rows(&[true, false, true]);
        assert_eq!(selected.n_rows(), 2);
        assert_eq!(selected.record_index(), &[0, 2]);
        assert_eq!(selected.row(1), &[3.0]);
    }
}
