//! Algorithm Selector
//!
//! Chooses an algorithm and its parameters from the number of feature
//! matrix rows, or resolves an explicit caller request.

use clustx_core::{Error, HeuristicsConfig, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    KMeans,
    Dbscan,
    Hdbscan,
    Hierarchical,
    Gmm,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::KMeans,
        Algorithm::Dbscan,
        Algorithm::Hdbscan,
        Algorithm::Hierarchical,
        Algorithm::Gmm,
    ];

    /// Human-readable name used in reports
    pub fn display_name(&self) -> &'static str {
        match self {
            Algorithm::KMeans => "K-Means",
            Algorithm::Dbscan => "DBSCAN",
            Algorithm::Hdbscan => "HDBSCAN",
            Algorithm::Hierarchical => "Hierarchical",
            Algorithm::Gmm => "GMM",
        }
    }

    /// Whether the algorithm can label records as noise
    #[inline]
    pub fn produces_noise(&self) -> bool {
        matches!(self, Algorithm::Dbscan | Algorithm::Hdbscan)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "kmeans" => Ok(Algorithm::KMeans),
            "dbscan" => Ok(Algorithm::Dbscan),
            "hdbscan" => Ok(Algorithm::Hdbscan),
            "hierarchical" | "agglomerative" => Ok(Algorithm::Hierarchical),
            "gmm" | "gaussianmixture" => Ok(Algorithm::Gmm),
            _ => Err(Error::InvalidConfig(format!("unknown algorithm: {}", s))),
        }
    }
}

/// Merge criterion for agglomerative clustering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    #[default]
    Ward,
    Complete,
    Average,
    Single,
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Linkage::Ward => "ward",
            Linkage::Complete => "complete",
            Linkage::Average => "average",
            Linkage::Single => "single",
        };
        f.write_str(name)
    }
}

impl FromStr for Linkage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ward" => Ok(Linkage::Ward),
            "complete" => Ok(Linkage::Complete),
            "average" => Ok(Linkage::Average),
            "single" => Ok(Linkage::Single),
            _ => Err(Error::InvalidConfig(format!("unknown linkage: {}", s))),
        }
    }
}

/// Covariance structure of mixture components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceType {
    #[default]
    Full,
    Diag,
}

impl fmt::Display for CovarianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CovarianceType::Full => f.write_str("full"),
            CovarianceType::Diag => f.write_str("diag"),
        }
    }
}

impl FromStr for CovarianceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(CovarianceType::Full),
            "diag" | "diagonal" => Ok(CovarianceType::Diag),
            _ => Err(Error::InvalidConfig(format!("unknown covariance type: {}", s))),
        }
    }
}

/// A resolved algorithm with every parameter filled in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum AlgorithmChoice {
    KMeans {
        n_clusters: usize,
    },
    Dbscan {
        eps: f64,
        min_samples: usize,
    },
    Hdbscan {
        min_cluster_size: usize,
        min_samples: usize,
    },
    Hierarchical {
        n_clusters: usize,
        linkage: Linkage,
    },
    Gmm {
        n_components: usize,
        covariance_type: CovarianceType,
    },
}

impl AlgorithmChoice {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            AlgorithmChoice::KMeans { .. } => Algorithm::KMeans,
            AlgorithmChoice::Dbscan { .. } => Algorithm::Dbscan,
            AlgorithmChoice::Hdbscan { .. } => Algorithm::Hdbscan,
            AlgorithmChoice::Hierarchical { .. } => Algorithm::Hierarchical,
            AlgorithmChoice::Gmm { .. } => Algorithm::Gmm,
        }
    }

    /// Parameter name to value, as reported alongside results
    pub fn parameters(&self) -> BTreeMap<&'static str, serde_json::Value> {
        let mut params = BTreeMap::new();
        match *self {
            AlgorithmChoice::KMeans { n_clusters } => {
                params.insert("n_clusters", n_clusters.into());
            }
            AlgorithmChoice::Dbscan { eps, min_samples } => {
                params.insert("eps", eps.into());
                params.insert("min_samples", min_samples.into());
            }
            AlgorithmChoice::Hdbscan {
                min_cluster_size,
                min_samples,
            } => {
                params.insert("min_cluster_size", min_cluster_size.into());
                params.insert("min_samples", min_samples.into());
            }
            AlgorithmChoice::Hierarchical {
                n_clusters,
                linkage,
            } => {
                params.insert("n_clusters", n_clusters.into());
                params.insert("linkage", linkage.to_string().into());
            }
            AlgorithmChoice::Gmm {
                n_components,
                covariance_type,
            } => {
                params.insert("n_components", n_components.into());
                params.insert("covariance_type", covariance_type.to_string().into());
            }
        }
        params
    }

    /// Check the parameters against a matrix with `n` rows.
    ///
    /// Cluster counts must be at least 1 and below `n`; density parameters
    /// must be positive.
    pub fn validate(&self, n: usize) -> Result<()> {
        match *self {
            AlgorithmChoice::KMeans { n_clusters: k }
            | AlgorithmChoice::Hierarchical { n_clusters: k, .. }
            | AlgorithmChoice::Gmm { n_components: k, .. } => {
                if k == 0 {
                    return Err(Error::ClusteringExecution(
                        "cluster count must be at least 1".to_string(),
                    ));
                }
                if k >= n {
                    return Err(Error::InsufficientSamples {
                        required: k + 1,
                        actual: n,
                    });
                }
            }
            AlgorithmChoice::Dbscan { eps, min_samples } => {
                if !(eps.is_finite() && eps > 0.0) {
                    return Err(Error::ClusteringExecution(format!(
                        "eps must be positive, got {}",
                        eps
                    )));
                }
                if min_samples == 0 {
                    return Err(Error::ClusteringExecution(
                        "min_samples must be at least 1".to_string(),
                    ));
                }
                if n == 0 {
                    return Err(Error::InsufficientSamples {
                        required: 1,
                        actual: 0,
                    });
                }
            }
            AlgorithmChoice::Hdbscan {
                min_cluster_size,
                min_samples,
            } => {
                if min_cluster_size < 2 {
                    return Err(Error::ClusteringExecution(format!(
                        "min_cluster_size must be at least 2, got {}",
                        min_cluster_size
                    )));
                }
                if min_samples == 0 {
                    return Err(Error::ClusteringExecution(
                        "min_samples must be at least 1".to_string(),
                    ));
                }
                if n < min_cluster_size {
                    return Err(Error::InsufficientSamples {
                        required: min_cluster_size,
                        actual: n,
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for AlgorithmChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .parameters()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} ({})", self.algorithm(), params)
    }
}

/// Explicit algorithm request; unset parameters take per-algorithm defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmRequest {
    pub algorithm: Algorithm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_clusters: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_samples: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cluster_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkage: Option<Linkage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariance_type: Option<CovarianceType>,
}

impl AlgorithmRequest {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            n_clusters: None,
            eps: None,
            min_samples: None,
            min_cluster_size: None,
            linkage: None,
            covariance_type: None,
        }
    }

    #[must_use]
    pub fn with_n_clusters(mut self, n_clusters: usize) -> Self {
        self.n_clusters = Some(n_clusters);
        self
    }

    #[must_use]
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = Some(eps);
        self
    }

    #[must_use]
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = Some(min_samples);
        self
    }

    #[must_use]
    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = Some(min_cluster_size);
        self
    }

    #[must_use]
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = Some(linkage);
        self
    }

    #[must_use]
    pub fn with_covariance_type(mut self, covariance_type: CovarianceType) -> Self {
        self.covariance_type = Some(covariance_type);
        self
    }
}

impl From<AlgorithmChoice> for AlgorithmRequest {
    fn from(choice: AlgorithmChoice) -> Self {
        let request = AlgorithmRequest::new(choice.algorithm());
        match choice {
            AlgorithmChoice::KMeans { n_clusters } => request.with_n_clusters(n_clusters),
            AlgorithmChoice::Dbscan { eps, min_samples } => {
                request.with_eps(eps).with_min_samples(min_samples)
            }
            AlgorithmChoice::Hdbscan {
                min_cluster_size,
                min_samples,
            } => request
                .with_min_cluster_size(min_cluster_size)
                .with_min_samples(min_samples),
            AlgorithmChoice::Hierarchical {
                n_clusters,
                linkage,
            } => request.with_n_clusters(n_clusters).with_linkage(linkage),
            AlgorithmChoice::Gmm {
                n_components,
                covariance_type,
            } => request
                .with_n_clusters(n_components)
                .with_covariance_type(covariance_type),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlgorithmSelector {
    config: HeuristicsConfig,
}

impl AlgorithmSelector {
    pub fn new(config: HeuristicsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeuristicsConfig {
        &self.config
    }

    /// Automatic choice for a matrix with `n` rows
    pub fn select(&self, n: usize) -> Result<AlgorithmChoice> {
        let c = &self.config;
        // the small band stays centroid-based even when centroid_max_samples sits below it
        let choice = if n < c.small_sample_threshold {
            debug!("{} samples is too few for density estimation", n);
            AlgorithmChoice::KMeans {
                n_clusters: c.cluster_count_for(n),
            }
        } else if n <= c.centroid_max_samples {
            AlgorithmChoice::KMeans {
                n_clusters: c.cluster_count_for(n),
            }
        } else if n <= c.radius_density_max_samples {
            AlgorithmChoice::Dbscan {
                eps: c.dbscan_eps,
                min_samples: c.dbscan_min_samples_for(n),
            }
        } else {
            let min_cluster_size = c.hdbscan_min_cluster_size_for(n);
            AlgorithmChoice::Hdbscan {
                min_cluster_size,
                min_samples: c.hdbscan_min_samples_for(min_cluster_size),
            }
        };
        choice.validate(n)?;
        info!("Auto-selected {} for {} samples", choice, n);
        Ok(choice)
    }

    /// Resolve a caller request, or fall back to [`select`](Self::select)
    pub fn resolve(&self, n: usize, request: Option<&AlgorithmRequest>) -> Result<AlgorithmChoice> {
        let Some(request) = request else {
            return self.select(n);
        };

        let c = &self.config;
        let n_clusters = request.n_clusters.unwrap_or_else(|| c.cluster_count_for(n));
        let choice = match request.algorithm {
            Algorithm::KMeans => AlgorithmChoice::KMeans { n_clusters },
            Algorithm::Dbscan => AlgorithmChoice::Dbscan {
                eps: request.eps.unwrap_or(c.dbscan_eps),
                min_samples: request
                    .min_samples
                    .unwrap_or_else(|| c.dbscan_min_samples_for(n)),
            },
            Algorithm::Hdbscan => {
                let min_cluster_size = request
                    .min_cluster_size
                    .unwrap_or_else(|| c.hdbscan_min_cluster_size_for(n));
                AlgorithmChoice::Hdbscan {
                    min_cluster_size,
                    min_samples: request
                        .min_samples
                        .unwrap_or_else(|| c.hdbscan_min_samples_for(min_cluster_size)),
                }
            }
            Algorithm::Hierarchical => AlgorithmChoice::Hierarchical {
                n_clusters,
                linkage: request.linkage.unwrap_or_default(),
            },
            Algorithm::Gmm => AlgorithmChoice::Gmm {
                n_components: n_clusters,
                covariance_type: request.covariance_type.unwrap_or_default(),
            },
        };
        choice.validate(n)?;
        info!("Using requested {} for {} samples", choice, n);
        Ok(choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_sample_uses_kmeans() {
        let selector = AlgorithmSelector::default();
        match selector.select(5).unwrap() {
            AlgorithmChoice::KMeans { n_clusters } => assert!(n_clusters <= 4),
            other => panic!("unexpected choice {:?}", other),
        }
        assert_eq!(
            selector.select(3).unwrap(),
            AlgorithmChoice::KMeans { n_clusters: 2 }
        );
        assert_eq!(
            selector.select(50).unwrap(),
            AlgorithmChoice::KMeans { n_clusters: 3 }
        );
    }

    #[test]
    fn test_small_sample_threshold_overrides_centroid_band() {
        let selector = AlgorithmSelector::new(HeuristicsConfig {
            small_sample_threshold: 20,
            centroid_max_samples: 5,
            ..Default::default()
        });
        assert_eq!(
            selector.select(15).unwrap(),
            AlgorithmChoice::KMeans { n_clusters: 3 }
        );
        assert_eq!(selector.select(20).unwrap().algorithm(), Algorithm::Dbscan);
    }

    #[test]
    fn test_medium_sample_uses_dbscan() {
        let selector = AlgorithmSelector::default();
        assert_eq!(
            selector.select(75).unwrap(),
            AlgorithmChoice::Dbscan {
                eps: 0.5,
                min_samples: 3
            }
        );
        assert_eq!(selector.select(51).unwrap().algorithm(), Algorithm::Dbscan);
        assert_eq!(selector.select(100).unwrap().algorithm(), Algorithm::Dbscan);
    }

    #[test]
    fn test_large_sample_uses_hdbscan() {
        let selector = AlgorithmSelector::default();
        assert_eq!(
            selector.select(500).unwrap(),
            AlgorithmChoice::Hdbscan {
                min_cluster_size: 25,
                min_samples: 12
            }
        );
        assert_eq!(selector.select(101).unwrap().algorithm(), Algorithm::Hdbscan);
    }

    #[test]
    fn test_single_row_is_insufficient() {
        let selector = AlgorithmSelector::default();
        assert!(matches!(
            selector.select(1),
            Err(Error::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn test_request_more_clusters_than_rows() {
        let selector = AlgorithmSelector::default();
        let request = AlgorithmRequest::new(Algorithm::KMeans).with_n_clusters(10);
        assert!(matches!(
            selector.resolve(5, Some(&request)),
            Err(Error::InsufficientSamples {
                required: 11,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_request_fills_defaults() {
        let selector = AlgorithmSelector::default();
        let request = AlgorithmRequest::new(Algorithm::Hdbscan).with_min_cluster_size(10);
        assert_eq!(
            selector.resolve(1000, Some(&request)).unwrap(),
            AlgorithmChoice::Hdbscan {
                min_cluster_size: 10,
                min_samples: 5
            }
        );

        let request = AlgorithmRequest::new(Algorithm::Hierarchical);
        assert_eq!(
            selector.resolve(20, Some(&request)).unwrap(),
            AlgorithmChoice::Hierarchical {
                n_clusters: 3,
                linkage: Linkage::Ward
            }
        );
    }

    #[test]
    fn test_request_bypasses_policy() {
        let selector = AlgorithmSelector::default();
        let request = AlgorithmRequest::new(Algorithm::Dbscan).with_eps(1.2);
        let choice = selector.resolve(20, Some(&request)).unwrap();
        assert_eq!(
            choice,
            AlgorithmChoice::Dbscan {
                eps: 1.2,
                min_samples: 3
            }
        );
    }

    #[test]
    fn test_invalid_density_parameters() {
        let selector = AlgorithmSelector::default();
        let request = AlgorithmRequest::new(Algorithm::Dbscan).with_eps(-1.0);
        assert!(matches!(
            selector.resolve(80, Some(&request)),
            Err(Error::ClusteringExecution(_))
        ));
        let request = AlgorithmRequest::new(Algorithm::KMeans).with_n_clusters(0);
        assert!(matches!(
            selector.resolve(80, Some(&request)),
            Err(Error::ClusteringExecution(_))
        ));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("k-means".parse::<Algorithm>().unwrap(), Algorithm::KMeans);
        assert_eq!("HDBSCAN".parse::<Algorithm>().unwrap(), Algorithm::Hdbscan);
        assert_eq!("agglomerative".parse::<Algorithm>().unwrap(), Algorithm::Hierarchical);
        assert!("spectral".parse::<Algorithm>().is_err());
        assert_eq!("diag".parse::<CovarianceType>().unwrap(), CovarianceType::Diag);
        assert_eq!(Algorithm::KMeans.to_string(), "K-Means");
    }

    #[test]
    fn test_choice_serde_is_tagged() {
        let choice = AlgorithmChoice::Dbscan {
            eps: 0.5,
            min_samples: 3,
        };
        let json = serde_json::to_value(choice).unwrap();
        assert_eq!(json["algorithm"], "dbscan");
        assert_eq!(json["min_samples"], 3);
    }
}
