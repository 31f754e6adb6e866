//! Projection Builder
//!
//! Reduces the feature matrix to two display axes. Matrices with more than
//! two features are projected onto their two principal components; two
//! features pass through unchanged and a single feature is padded with a
//! zero second axis.

use clustx_core::{Error, FeatureMatrix, LabelAssignment, Result, NOISE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const JACOBI_MAX_SWEEPS: usize = 100;
const JACOBI_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMethod {
    Pca,
    /// Exactly two features, copied as-is
    Identity,
    /// One feature plus a zero axis
    Padded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub method: ProjectionMethod,
    pub coordinates: Vec<[f64; 2]>,
    /// Cumulative fraction of variance kept by both axes, in `[0, 1]`
    pub explained_variance_ratio: f64,
    pub axis_variance_ratio: [f64; 2],
    pub axis_labels: [String; 2],
    pub labels: Vec<i32>,
    pub record_index: Vec<usize>,
}

/// Points of one cluster, or of the noise group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSeries {
    pub name: String,
    pub cluster_id: i32,
    pub is_noise: bool,
    pub points: Vec<[f64; 2]>,
    pub record_index: Vec<usize>,
}

impl Projection {
    #[inline]
    pub fn is_noise(&self, i: usize) -> bool {
        self.labels.get(i) == Some(&NOISE)
    }

    /// One series per cluster in ascending id order, noise last
    pub fn series(&self) -> Vec<ProjectionSeries> {
        let mut groups: BTreeMap<i32, ProjectionSeries> = BTreeMap::new();
        for ((point, &label), &row) in self
            .coordinates
            .iter()
            .zip(&self.labels)
            .zip(&self.record_index)
        {
            let series = groups.entry(label).or_insert_with(|| ProjectionSeries {
                name: if label == NOISE {
                    "Noise".to_string()
                } else {
                    format!("Cluster {}", label)
                },
                cluster_id: label,
                is_noise: label == NOISE,
                points: Vec::new(),
                record_index: Vec::new(),
            });
            series.points.push(*point);
            series.record_index.push(row);
        }

        let noise = groups.remove(&NOISE);
        groups.into_values().chain(noise).collect()
    }
}

/// Build the 2-D projection of `matrix`, carrying `labels` for rendering
pub fn project(matrix: &FeatureMatrix, labels: &LabelAssignment) -> Result<Projection> {
    if labels.len() != matrix.n_rows() {
        return Err(Error::InvalidConfig(format!(
            "{} labels for {} matrix rows",
            labels.len(),
            matrix.n_rows()
        )));
    }

    let names = matrix.feature_names();
    let (method, coordinates, axis_variance_ratio, axis_labels): (
        ProjectionMethod,
        Vec<[f64; 2]>,
        [f64; 2],
        [String; 2],
    ) = match matrix.n_features() {
        1 => (
            ProjectionMethod::Padded,
            matrix.rows().map(|r| [r[0], 0.0]).collect(),
            [1.0, 0.0],
            [names[0].clone(), "Value".to_string()],
        ),
        2 => {
            let (vx, vy) = (variance(&matrix.column(0)), variance(&matrix.column(1)));
            let total = vx + vy;
            let ratios = if total > 0.0 {
                [vx / total, vy / total]
            } else {
                [0.5, 0.5]
            };
            (
                ProjectionMethod::Identity,
                matrix.rows().map(|r| [r[0], r[1]]).collect(),
                ratios,
                [names[0].clone(), names[1].clone()],
            )
        }
        _ => {
            let (coordinates, ratios) = principal_components(matrix);
            (
                ProjectionMethod::Pca,
                coordinates,
                ratios,
                [
                    format!(
                        "First Principal Component ({:.1}% variance)",
                        ratios[0] * 100.0
                    ),
                    "Second Principal Component".to_string(),
                ],
            )
        }
    };

    let explained_variance_ratio = (axis_variance_ratio[0] + axis_variance_ratio[1]).clamp(0.0, 1.0);
    debug!(
        "projection {:?} keeps {:.1}% of variance",
        method,
        explained_variance_ratio * 100.0
    );
    Ok(Projection {
        method,
        coordinates,
        explained_variance_ratio,
        axis_variance_ratio,
        axis_labels,
        labels: labels.as_slice().to_vec(),
        record_index: labels.record_index().to_vec(),
    })
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Scores on the two leading principal axes and their variance ratios
fn principal_components(matrix: &FeatureMatrix) -> (Vec<[f64; 2]>, [f64; 2]) {
    let d = matrix.n_features();
    let n = matrix.n_rows().max(1) as f64;
    let means = matrix.column_means();

    let mut cov = vec![0.0; d * d];
    for row in matrix.rows() {
        for a in 0..d {
            let da = row[a] - means[a];
            for b in a..d {
                cov[a * d + b] += da * (row[b] - means[b]);
            }
        }
    }
    for a in 0..d {
        for b in a..d {
            cov[a * d + b] /= n;
            cov[b * d + a] = cov[a * d + b];
        }
    }

    let (values, vectors) = jacobi_eigen(cov, d);
    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let total: f64 = values.iter().map(|v| v.max(0.0)).sum();
    let axes: Vec<Vec<f64>> = order[..2]
        .iter()
        .map(|&c| {
            let mut axis: Vec<f64> = (0..d).map(|r| vectors[r * d + c]).collect();
            // largest loading positive so repeated runs agree
            let pivot = axis
                .iter()
                .copied()
                .max_by(|a, b| a.abs().total_cmp(&b.abs()))
                .unwrap_or(0.0);
            if pivot < 0.0 {
                axis.iter_mut().for_each(|v| *v = -*v);
            }
            axis
        })
        .collect();

    let ratios = if total > 0.0 {
        [
            values[order[0]].max(0.0) / total,
            values[order[1]].max(0.0) / total,
        ]
    } else {
        [0.0, 0.0]
    };

    let coordinates = matrix
        .rows()
        .map(|row| {
            let mut point = [0.0; 2];
            for (p, axis) in point.iter_mut().zip(&axes) {
                *p = row
                    .iter()
                    .zip(&means)
                    .zip(axis)
                    .map(|((x, m), w)| (x - m) * w)
                    .sum();
            }
            point
        })
        .collect();
    (coordinates, ratios)
}

/// Cyclic Jacobi eigen-decomposition of a symmetric `d x d` matrix.
/// Returns eigenvalues and the row-major matrix whose columns are eigenvectors.
fn jacobi_eigen(mut a: Vec<f64>, d: usize) -> (Vec<f64>, Vec<f64>) {
    let mut v = vec![0.0; d * d];
    for i in 0..d {
        v[i * d + i] = 1.0;
    }

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..d)
            .flat_map(|p| ((p + 1)..d).map(move |q| (p, q)))
            .map(|(p, q)| a[p * d + q] * a[p * d + q])
            .sum();
        if off < JACOBI_EPS {
            break;
        }

        for p in 0..d {
            for q in (p + 1)..d {
                let apq = a[p * d + q];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[q * d + q] - a[p * d + p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..d {
                    let akp = a[k * d + p];
                    let akq = a[k * d + q];
                    a[k * d + p] = c * akp - s * akq;
                    a[k * d + q] = s * akp + c * akq;
                }
                for k in 0..d {
                    let apk = a[p * d + k];
                    let aqk = a[q * d + k];
                    a[p * d + k] = c * apk - s * aqk;
                    a[q * d + k] = s * apk + c * aqk;
                }
                for k in 0..d {
                    let vkp = v[k * d + p];
                    let vkq = v[k * d + q];
                    v[k * d + p] = c * vkp - s * vkq;
                    v[k * d + q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let values = (0..d).map(|i| a[i * d + i]).collect();
    (values, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_columns_pass_through() {
        let m = FeatureMatrix::new(
            vec![1.0, -1.0, -1.0, 1.0, 0.5, 0.5],
            2,
            vec!["age".to_string(), "income".to_string()],
            vec![0, 1, 2],
        )
        .unwrap();
        let labels = LabelAssignment::from_labels(vec![0, 1, NOISE]);
        let p = project(&m, &labels).unwrap();
        assert_eq!(p.method, ProjectionMethod::Identity);
        assert_eq!(p.coordinates, vec![[1.0, -1.0], [-1.0, 1.0], [0.5, 0.5]]);
        assert_eq!(p.axis_labels, ["age".to_string(), "income".to_string()]);
        assert!((p.explained_variance_ratio - 1.0).abs() < 1e-12);
        assert!(p.is_noise(2));
    }

    #[test]
    fn test_single_column_is_padded() {
        let m = FeatureMatrix::new(vec![1.0, -1.0], 1, vec!["x".to_string()], vec![0, 1]).unwrap();
        let p = project(&m, &LabelAssignment::from_labels(vec![0, 0])).unwrap();
        assert_eq!(p.method, ProjectionMethod::Padded);
        assert_eq!(p.coordinates, vec![[1.0, 0.0], [-1.0, 0.0]]);
        assert_eq!(p.axis_labels[1], "Value");
    }

    #[test]
    fn test_pca_finds_dominant_axis() {
        // points along (1, 1, 0) with a little spread on the third axis
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let t = i as f64 - 10.0;
                vec![t, t, if i % 2 == 0 { 0.1 } else { -0.1 }]
            })
            .collect();
        let m = FeatureMatrix::from_rows(&rows).unwrap();
        let p = project(&m, &LabelAssignment::from_labels(vec![0; 20])).unwrap();
        assert_eq!(p.method, ProjectionMethod::Pca);
        assert!(p.axis_variance_ratio[0] > 0.99);
        assert!(p.explained_variance_ratio <= 1.0 && p.explained_variance_ratio > 0.99);
        // first score grows with t
        assert!(p.coordinates[19][0] > p.coordinates[0][0]);
        // centered t is 9.5 for the last row
        let expected = (2.0f64).sqrt() * 9.5;
        assert!((p.coordinates[19][0] - expected).abs() < 1e-3);
        assert!(p.axis_labels[0].starts_with("First Principal Component ("));
    }

    #[test]
    fn test_jacobi_diagonalizes() {
        let (values, vectors) = jacobi_eigen(vec![2.0, 1.0, 1.0, 2.0], 2);
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert!((sorted[0] - 1.0).abs() < 1e-9);
        assert!((sorted[1] - 3.0).abs() < 1e-9);
        let norm: f64 = (vectors[0] * vectors[0] + vectors[2] * vectors[2]).sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_series_groups_noise_last() {
        let m = FeatureMatrix::from_rows(&[vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]])
            .unwrap();
        let labels = LabelAssignment::from_labels(vec![NOISE, 1, 0, 1]);
        let series = project(&m, &labels).unwrap().series();
        let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Cluster 0", "Cluster 1", "Noise"]);
        assert_eq!(series[1].record_index, vec![1, 3]);
        assert!(series[2].is_noise);
    }
}
