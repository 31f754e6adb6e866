use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label given to records that no cluster claimed
pub const NOISE: i32 = -1;

/// Cluster labels aligned positionally with feature matrix rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLabelAssignment")]
pub struct LabelAssignment {
    labels: Vec<i32>,
    /// Dataset row position of each label
    record_index: Vec<usize>,
}

impl LabelAssignment {
    /// Labels for rows `0..labels.len()` of the dataset
    pub fn from_labels(labels: Vec<i32>) -> Self {
        let record_index = (0..labels.len()).collect();
        Self {
            labels,
            record_index,
        }
    }

    /// Labels paired with the dataset rows they belong to
    pub fn new(labels: Vec<i32>, record_index: Vec<usize>) -> Result<Self> {
        if labels.len() != record_index.len() {
            return Err(Error::InvalidConfig(format!(
                "{} labels for {} record positions",
                labels.len(),
                record_index.len()
            )));
        }
        Ok(Self {
            labels,
            record_index,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        &self.labels
    }

    #[inline]
    pub fn record_index(&self) -> &[usize] {
        &self.record_index
    }

    /// `(dataset row, label)` pairs in matrix order
    pub fn iter(&self) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.record_index
            .iter()
            .copied()
            .zip(self.labels.iter().copied())
    }

    /// Distinct non-noise labels, ascending
    pub fn cluster_ids(&self) -> Vec<i32> {
        self.cluster_sizes().into_keys().collect()
    }

    /// Size of every non-noise cluster, keyed by label
    pub fn cluster_sizes(&self) -> BTreeMap<i32, usize> {
        let mut sizes = BTreeMap::new();
        for &label in self.labels.iter().filter(|&&l| l != NOISE) {
            *sizes.entry(label).or_insert(0) += 1;
        }
        sizes
    }

    #[inline]
    pub fn cluster_count(&self) -> usize {
        self.cluster_sizes().len()
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }

    pub fn has_noise(&self) -> bool {
        self.labels.contains(&NOISE)
    }

    /// Dataset rows carrying `label`
    pub fn members(&self, label: i32) -> Vec<usize> {
        self.iter()
            .filter(|&(_, l)| l == label)
            .map(|(row, _)| row)
            .collect()
    }
}

/// Unchecked wire form, validated through [`LabelAssignment::new`]
#[derive(Deserialize)]
struct RawLabelAssignment {
    labels: Vec<i32>,
    record_index: Vec<usize>,
}

impl TryFrom<RawLabelAssignment> for LabelAssignment {
    type Error = Error;

    fn try_from(raw: RawLabelAssignment) -> Result<Self> {
        Self::new(raw.labels, raw.record_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let labels = LabelAssignment::from_labels(vec![0, 1, -1, 1, 2, -1]);
        assert_eq!(labels.len(), 6);
        assert_eq!(labels.cluster_ids(), vec![0, 1, 2]);
        assert_eq!(labels.cluster_count(), 3);
        assert_eq!(labels.noise_count(), 2);
        assert!(labels.has_noise());
        assert_eq!(labels.cluster_sizes()[&1], 2);
    }

    #[test]
    fn test_members_use_record_index() {
        let labels = LabelAssignment::new(vec![0, 1, 0], vec![2, 5, 7]).unwrap();
        assert_eq!(labels.members(0), vec![2, 7]);
        assert_eq!(labels.members(NOISE), Vec::<usize>::new());
    }

    #[test]
    fn test_empty() {
        let labels = LabelAssignment::from_labels(vec![]);
        assert!(labels.is_empty());
        assert_eq!(labels.cluster_count(), 0);
    }

    #[test]
    fn test_new_rejects_mismatched_lengths() {
        let result = LabelAssignment::new(vec![0, 1], vec![0]);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_deserialize_rejects_mismatched_lengths() {
        let json = r#"{"labels":[0,1,1],"record_index":[0]}"#;
        assert!(serde_json::from_str::<LabelAssignment>(json).is_err());

        let labels = LabelAssignment::new(vec![0, NOISE], vec![3, 8]).unwrap();
        let json = serde_json::to_string(&labels).unwrap();
        let restored: LabelAssignment = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, labels);
        assert_eq!(restored.members(NOISE), vec![8]);
    }
}
