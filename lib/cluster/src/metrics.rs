//! Metrics Calculator
//!
//! Silhouette, Davies-Bouldin and Calinski-Harabasz scores computed over
//! non-noise rows. A partition with fewer than two clusters, or with every
//! point in its own cluster, is reported as degenerate with counts only.

use clustx_core::distance::{euclidean, squared_euclidean};
use clustx_core::{Error, FeatureMatrix, LabelAssignment, Result, NOISE};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    Computed,
    /// Clustering succeeded but the partition cannot be scored
    Degenerate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub status: MetricStatus,
    /// In `[-1, 1]`, higher is better
    pub silhouette_score: Option<f64>,
    /// Lower is better
    pub davies_bouldin_index: Option<f64>,
    /// Higher is better
    pub calinski_harabasz_index: Option<f64>,
    pub n_clusters: usize,
    pub n_noise: usize,
}

impl MetricSet {
    fn degenerate(n_clusters: usize, n_noise: usize) -> Self {
        Self {
            status: MetricStatus::Degenerate,
            silhouette_score: None,
            davies_bouldin_index: None,
            calinski_harabasz_index: None,
            n_clusters,
            n_noise,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.status == MetricStatus::Degenerate
    }

    /// Metric name to score. Empty for a degenerate partition.
    pub fn as_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        if self.is_degenerate() {
            return map;
        }
        let scores = [
            ("silhouette_score", self.silhouette_score),
            ("davies_bouldin_index", self.davies_bouldin_index),
            ("calinski_harabasz_index", self.calinski_harabasz_index),
        ];
        for (name, score) in scores {
            if let Some(score) = score {
                map.insert(name.to_string(), score);
            }
        }
        map.insert("n_clusters".to_string(), self.n_clusters as f64);
        map.insert("n_noise".to_string(), self.n_noise as f64);
        map
    }
}

/// Score `labels` against `matrix`. Fails only when the two disagree in length.
pub fn compute_metrics(matrix: &FeatureMatrix, labels: &LabelAssignment) -> Result<MetricSet> {
    if labels.len() != matrix.n_rows() {
        return Err(Error::InvalidConfig(format!(
            "{} labels for {} matrix rows",
            labels.len(),
            matrix.n_rows()
        )));
    }

    let n_clusters = labels.cluster_count();
    let n_noise = labels.noise_count();
    let mask: Vec<bool> = labels.as_slice().iter().map(|&l| l != NOISE).collect();
    let clustered = matrix.select_rows(&mask);
    let n = clustered.n_rows();

    if n_clusters < 2 || n_clusters >= n {
        warn!(
            "Degenerate partition: {} clusters over {} clustered rows, metrics skipped",
            n_clusters, n
        );
        return Ok(MetricSet::degenerate(n_clusters, n_noise));
    }

    // dense 0..k indices for the clustered rows
    let ids = labels.cluster_ids();
    let dense: Vec<usize> = labels
        .as_slice()
        .iter()
        .filter(|&&l| l != NOISE)
        .map(|l| ids.binary_search(l).unwrap_or(0))
        .collect();

    let centroids = centroids(&clustered, &dense, ids.len());
    let silhouette = silhouette(&clustered, &dense, ids.len());
    let davies_bouldin = davies_bouldin(&clustered, &dense, &centroids);
    let calinski_harabasz = calinski_harabasz(&clustered, &dense, &centroids);

    debug!(
        "metrics: silhouette {:.4}, davies-bouldin {:.4}, calinski-harabasz {:.4}",
        silhouette, davies_bouldin, calinski_harabasz
    );
    Ok(MetricSet {
        status: MetricStatus::Computed,
        silhouette_score: Some(silhouette),
        davies_bouldin_index: Some(davies_bouldin),
        calinski_harabasz_index: Some(calinski_harabasz),
        n_clusters,
        n_noise,
    })
}

/// Per-cluster centroid and member count
fn centroids(matrix: &FeatureMatrix, labels: &[usize], k: usize) -> Vec<(Vec<f64>, usize)> {
    let mut sums = vec![(vec![0.0; matrix.n_features()], 0usize); k];
    for (row, &c) in matrix.rows().zip(labels) {
        let (sum, count) = &mut sums[c];
        for (s, v) in sum.iter_mut().zip(row) {
            *s += v;
        }
        *count += 1;
    }
    for (sum, count) in &mut sums {
        let count = (*count).max(1) as f64;
        sum.iter_mut().for_each(|s| *s /= count);
    }
    sums
}

/// Mean silhouette coefficient. Members of singleton clusters score 0.
fn silhouette(matrix: &FeatureMatrix, labels: &[usize], k: usize) -> f64 {
    let mut sizes = vec![0usize; k];
    for &c in labels {
        sizes[c] += 1;
    }

    let scores: Vec<f64> = (0..matrix.n_rows())
        .into_par_iter()
        .map(|i| {
            let own = labels[i];
            if sizes[own] < 2 {
                return 0.0;
            }
            let mut totals = vec![0.0; k];
            let x = matrix.row(i);
            for (j, row) in matrix.rows().enumerate() {
                if j != i {
                    totals[labels[j]] += euclidean(x, row);
                }
            }
            let a = totals[own] / (sizes[own] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != own && sizes[c] > 0)
                .map(|c| totals[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 && denom.is_finite() {
                (b - a) / denom
            } else {
                0.0
            }
        })
        .collect();

    scores.iter().sum::<f64>() / scores.len() as f64
}

fn davies_bouldin(matrix: &FeatureMatrix, labels: &[usize], centroids: &[(Vec<f64>, usize)]) -> f64 {
    let k = centroids.len();
    let mut scatter = vec![0.0; k];
    for (row, &c) in matrix.rows().zip(labels) {
        scatter[c] += euclidean(row, &centroids[c].0);
    }
    for (s, (_, count)) in scatter.iter_mut().zip(centroids) {
        *s /= (*count).max(1) as f64;
    }

    let total: f64 = (0..k)
        .map(|i| {
            (0..k)
                .filter(|&j| j != i)
                .map(|j| {
                    let separation = euclidean(&centroids[i].0, &centroids[j].0);
                    if separation > 0.0 {
                        (scatter[i] + scatter[j]) / separation
                    } else {
                        0.0
                    }
                })
                .fold(0.0, f64::max)
        })
        .sum();
    total / k as f64
}

fn calinski_harabasz(
    matrix: &FeatureMatrix,
    labels: &[usize],
    centroids: &[(Vec<f64>, usize)],
) -> f64 {
    let n = matrix.n_rows() as f64;
    let k = centroids.len() as f64;
    let overall = matrix.column_means();

    let between: f64 = centroids
        .iter()
        .map(|(c, count)| *count as f64 * squared_euclidean(c, &overall))
        .sum();
    let within: f64 = matrix
        .rows()
        .zip(labels)
        .map(|(row, &c)| squared_euclidean(row, &centroids[c].0))
        .sum();

    if within == 0.0 {
        1.0
    } else {
        between * (n - k) / (within * (k - 1.0))
    }
}
