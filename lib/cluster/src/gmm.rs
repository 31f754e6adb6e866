//! Gaussian mixture model fitted with expectation-maximization
//!
//! Responsibilities start from a k-means partition. EM stops once the
//! mean log-likelihood per sample improves by less than the tolerance.

use crate::executor::Clusterer;
use crate::kmeans::KMeans;
use crate::selector::CovarianceType;
use clustx_core::{Error, FeatureMatrix, HeuristicsConfig, Result};
use rayon::prelude::*;
use std::f64::consts::PI;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct GaussianMixture {
    n_components: usize,
    covariance_type: CovarianceType,
    max_iter: usize,
    tolerance: f64,
    reg_covar: f64,
    seed: u64,
}

/// One fitted component
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub kind: CovarianceType,
    pub weight: f64,
    pub mean: Vec<f64>,
    /// Row-major `d x d` matrix for full covariance, `d` variances for diagonal
    pub covariance: Vec<f64>,
    /// Lower Cholesky factor (full) or standard deviations (diagonal)
    factor: Vec<f64>,
    log_det: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GmmFit {
    pub components: Vec<Component>,
    pub labels: Vec<i32>,
    /// Mean log-likelihood per sample
    pub log_likelihood: f64,
    pub converged: bool,
    pub n_iter: usize,
}

impl GaussianMixture {
    pub fn new(n_components: usize, covariance_type: CovarianceType) -> Self {
        let defaults = HeuristicsConfig::default();
        Self {
            n_components,
            covariance_type,
            max_iter: defaults.gmm_max_iter,
            tolerance: defaults.gmm_tolerance,
            reg_covar: defaults.gmm_reg_covar,
            seed: defaults.random_seed,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: &HeuristicsConfig) -> Self {
        self.max_iter = config.gmm_max_iter;
        self.tolerance = config.gmm_tolerance;
        self.reg_covar = config.gmm_reg_covar;
        self.seed = config.random_seed;
        self
    }

    pub fn fit(&self, matrix: &FeatureMatrix) -> Result<GmmFit> {
        let n = matrix.n_rows();
        let k = self.n_components;
        if k == 0 {
            return Err(Error::ClusteringExecution(
                "n_components must be at least 1".to_string(),
            ));
        }
        if n < k {
            return Err(Error::InsufficientSamples {
                required: k,
                actual: n,
            });
        }

        let init = KMeans::new(k).with_n_init(1).with_seed(self.seed).fit(matrix)?;
        let mut resp = vec![0.0; n * k];
        for (i, &label) in init.labels.iter().enumerate() {
            resp[i * k + label as usize] = 1.0;
        }

        let mut components = self.m_step(matrix, &resp)?;
        let mut previous = f64::NEG_INFINITY;
        let mut converged = false;
        let mut n_iter = 0;

        for iter in 1..=self.max_iter {
            n_iter = iter;
            let (log_resp, log_likelihood) = e_step(matrix, &components)?;
            resp = log_resp.iter().map(|v| v.exp()).collect();
            components = self.m_step(matrix, &resp)?;
            if (log_likelihood - previous).abs() < self.tolerance {
                converged = true;
                break;
            }
            previous = log_likelihood;
        }
        if !converged {
            warn!(
                "Gaussian mixture did not converge in {} iterations; try a larger tolerance",
                self.max_iter
            );
        }

        let (log_resp, log_likelihood) = e_step(matrix, &components)?;
        let labels = log_resp
            .chunks_exact(k)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(c, _)| c as i32)
                    .unwrap_or(0)
            })
            .collect();

        debug!(
            "GMM k={} ({}) finished after {} iterations, log-likelihood {:.4}",
            k, self.covariance_type, n_iter, log_likelihood
        );
        Ok(GmmFit {
            components,
            labels,
            log_likelihood,
            converged,
            n_iter,
        })
    }

    fn m_step(&self, matrix: &FeatureMatrix, resp: &[f64]) -> Result<Vec<Component>> {
        let n = matrix.n_rows();
        let d = matrix.n_features();
        let k = self.n_components;

        (0..k)
            .map(|c| {
                let nk = matrix
                    .rows()
                    .enumerate()
                    .map(|(i, _)| resp[i * k + c])
                    .sum::<f64>()
                    + 10.0 * f64::EPSILON;

                let mut mean = vec![0.0; d];
                for (i, row) in matrix.rows().enumerate() {
                    let r = resp[i * k + c];
                    for (m, x) in mean.iter_mut().zip(row) {
                        *m += r * x;
                    }
                }
                mean.iter_mut().for_each(|m| *m /= nk);

                let (covariance, factor, log_det) = match self.covariance_type {
                    CovarianceType::Full => {
                        let mut cov = vec![0.0; d * d];
                        for (i, row) in matrix.rows().enumerate() {
                            let r = resp[i * k + c];
                            for a in 0..d {
                                let da = row[a] - mean[a];
                                for b in 0..=a {
                                    cov[a * d + b] += r * da * (row[b] - mean[b]);
                                }
                            }
                        }
                        for a in 0..d {
                            for b in 0..=a {
                                cov[a * d + b] /= nk;
                                cov[b * d + a] = cov[a * d + b];
                            }
                            cov[a * d + a] += self.reg_covar;
                        }
                        let chol = cholesky(&cov, d).ok_or_else(|| {
                            Error::ClusteringExecution(format!(
                                "covariance of component {} is not positive definite; increase reg_covar",
                                c
                            ))
                        })?;
                        let log_det = 2.0 * (0..d).map(|j| chol[j * d + j].ln()).sum::<f64>();
                        (cov, chol, log_det)
                    }
                    CovarianceType::Diag => {
                        let mut var = vec![0.0; d];
                        for (i, row) in matrix.rows().enumerate() {
                            let r = resp[i * k + c];
                            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                                *v += r * (x - m) * (x - m);
                            }
                        }
                        var.iter_mut().for_each(|v| *v = *v / nk + self.reg_covar);
                        let log_det = var.iter().map(|v| v.ln()).sum::<f64>();
                        let std: Vec<f64> = var.iter().map(|v| v.sqrt()).collect();
                        (var, std, log_det)
                    }
                };

                Ok(Component {
                    kind: self.covariance_type,
                    weight: nk / n as f64,
                    mean,
                    covariance,
                    factor,
                    log_det,
                })
            })
            .collect()
    }
}

impl Component {
    fn log_density(&self, x: &[f64]) -> f64 {
        let d = x.len();
        let maha = match self.kind {
            CovarianceType::Full => {
                // forward substitution L y = x - mean
                let mut y = vec![0.0; d];
                for a in 0..d {
                    let mut s = x[a] - self.mean[a];
                    for b in 0..a {
                        s -= self.factor[a * d + b] * y[b];
                    }
                    y[a] = s / self.factor[a * d + a];
                }
                y.iter().map(|v| v * v).sum::<f64>()
            }
            CovarianceType::Diag => x
                .iter()
                .zip(&self.mean)
                .zip(&self.factor)
                .map(|((xi, m), s)| ((xi - m) / s).powi(2))
                .sum(),
        };
        -0.5 * (d as f64 * (2.0 * PI).ln() + self.log_det + maha)
    }
}

/// Log responsibilities (row-major `n x k`) and the mean log-likelihood
fn e_step(matrix: &FeatureMatrix, components: &[Component]) -> Result<(Vec<f64>, f64)> {
    let k = components.len();
    let rows: Vec<(Vec<f64>, f64)> = (0..matrix.n_rows())
        .into_par_iter()
        .map(|i| {
            let x = matrix.row(i);
            let weighted: Vec<f64> = components
                .iter()
                .map(|c| c.weight.ln() + c.log_density(x))
                .collect();
            let max = weighted.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lse = max + weighted.iter().map(|w| (w - max).exp()).sum::<f64>().ln();
            (weighted.iter().map(|w| w - lse).collect(), lse)
        })
        .collect();

    let mut log_resp = Vec::with_capacity(matrix.n_rows() * k);
    let mut total = 0.0;
    for (row, lse) in rows {
        if !lse.is_finite() {
            return Err(Error::ClusteringExecution(
                "Gaussian mixture produced a non-finite likelihood".to_string(),
            ));
        }
        log_resp.extend(row);
        total += lse;
    }
    Ok((log_resp, total / matrix.n_rows() as f64))
}

/// Lower Cholesky factor of a symmetric `d x d` matrix, `None` if not positive definite
fn cholesky(a: &[f64], d: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0; d * d];
    for i in 0..d {
        for j in 0..=i {
            let s: f64 = (0..j).map(|p| l[i * d + p] * l[j * d + p]).sum();
            if i == j {
                let v = a[i * d + i] - s;
                if v <= 0.0 || !v.is_finite() {
                    return None;
                }
                l[i * d + j] = v.sqrt();
            } else {
                l[i * d + j] = (a[i * d + j] - s) / l[j * d + j];
            }
        }
    }
    Some(l)
}

impl Clusterer for GaussianMixture {
    fn fit_predict(&self, matrix: &FeatureMatrix) -> Result<Vec<i32>> {
        Ok(self.fit(matrix)?.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_groups() -> FeatureMatrix {
        let mut rows = Vec::new();
        for i in 0..15 {
            let t = i as f64 * 0.05;
            rows.push(vec![t, 0.3 - t * 0.5 + ((i * 7) % 5) as f64 * 0.04]);
        }
        for i in 0..15 {
            let t = i as f64 * 0.05;
            rows.push(vec![6.0 + t, 6.0 + (t * 1.7).sin() * 0.3]);
        }
        FeatureMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_full_covariance_separates_groups() {
        let fit = GaussianMixture::new(2, CovarianceType::Full).fit(&two_groups()).unwrap();
        assert!(fit.labels[..15].iter().all(|&l| l == fit.labels[0]));
        assert!(fit.labels[15..].iter().all(|&l| l == fit.labels[15]));
        assert_ne!(fit.labels[0], fit.labels[15]);
        let weights: f64 = fit.components.iter().map(|c| c.weight).sum();
        assert!((weights - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_diag_covariance_separates_groups() {
        let fit = GaussianMixture::new(2, CovarianceType::Diag).fit(&two_groups()).unwrap();
        assert_ne!(fit.labels[0], fit.labels[29]);
        assert!(fit.log_likelihood.is_finite());
    }

    #[test]
    fn test_cholesky() {
        let a = [4.0, 2.0, 2.0, 3.0];
        let l = cholesky(&a, 2).unwrap();
        assert!((l[0] - 2.0).abs() < 1e-12);
        assert!((l[2] - 1.0).abs() < 1e-12);
        assert!((l[3] - 2.0f64.sqrt()).abs() < 1e-12);
        assert!(cholesky(&[1.0, 2.0, 2.0, 1.0], 2).is_none());
    }
}
