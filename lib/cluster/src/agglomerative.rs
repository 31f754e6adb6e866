//! Agglomerative clustering with the nearest-neighbour chain algorithm
//!
//! Cluster distances are updated with the Lance-Williams formulas. Ward
//! linkage works on squared Euclidean distances. The dendrogram is cut
//! where exactly `n_clusters` groups remain.

use crate::executor::Clusterer;
use crate::selector::Linkage;
use clustx_core::distance::pairwise_euclidean;
use clustx_core::{Error, FeatureMatrix, Result};
use ordered_float::OrderedFloat;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Agglomerative {
    n_clusters: usize,
    linkage: Linkage,
}

/// One dendrogram merge between two original-row representatives
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub a: usize,
    pub b: usize,
    pub distance: f64,
}

impl Agglomerative {
    pub fn new(n_clusters: usize, linkage: Linkage) -> Self {
        Self {
            n_clusters,
            linkage,
        }
    }

    /// All `n - 1` merges sorted by merge distance
    pub fn dendrogram(&self, matrix: &FeatureMatrix) -> Vec<Merge> {
        let n = matrix.n_rows();
        let mut dist = pairwise_euclidean(matrix);
        if self.linkage == Linkage::Ward {
            dist.iter_mut().for_each(|d| *d *= *d);
        }

        let mut size = vec![1usize; n];
        let mut active = vec![true; n];
        let mut remaining = n;
        let mut chain: Vec<usize> = Vec::with_capacity(n);
        let mut merges = Vec::with_capacity(n.saturating_sub(1));

        while remaining > 1 {
            if chain.is_empty() {
                if let Some(first) = active.iter().position(|&a| a) {
                    chain.push(first);
                }
            }
            let Some(&a) = chain.last() else { break };

            // prefer the previous chain element on ties so the chain terminates
            let previous = chain.len().checked_sub(2).map(|i| chain[i]);
            let mut best = previous;
            let mut best_dist = previous.map(|p| dist[a * n + p]).unwrap_or(f64::INFINITY);
            for c in (0..n).filter(|&c| active[c] && c != a) {
                if dist[a * n + c] < best_dist {
                    best_dist = dist[a * n + c];
                    best = Some(c);
                }
            }
            let Some(b) = best else { break };

            if Some(b) != previous {
                chain.push(b);
                continue;
            }

            chain.truncate(chain.len() - 2);
            merges.push(Merge {
                a,
                b,
                distance: best_dist,
            });

            // `a` keeps the merged cluster, `b` retires
            let (size_a, size_b) = (size[a] as f64, size[b] as f64);
            for c in (0..n).filter(|&c| active[c] && c != a && c != b) {
                let size_c = size[c] as f64;
                let (d_ac, d_bc) = (dist[a * n + c], dist[b * n + c]);
                let updated = match self.linkage {
                    Linkage::Single => d_ac.min(d_bc),
                    Linkage::Complete => d_ac.max(d_bc),
                    Linkage::Average => (size_a * d_ac + size_b * d_bc) / (size_a + size_b),
                    Linkage::Ward => {
                        ((size_a + size_c) * d_ac + (size_b + size_c) * d_bc - size_c * best_dist)
                            / (size_a + size_b + size_c)
                    }
                };
                dist[a * n + c] = updated;
                dist[c * n + a] = updated;
            }
            size[a] += size[b];
            active[b] = false;
            remaining -= 1;
        }

        merges.sort_by_key(|m| OrderedFloat(m.distance));
        merges
    }
}

impl Clusterer for Agglomerative {
    fn fit_predict(&self, matrix: &FeatureMatrix) -> Result<Vec<i32>> {
        let n = matrix.n_rows();
        if self.n_clusters == 0 {
            return Err(Error::ClusteringExecution(
                "n_clusters must be at least 1".to_string(),
            ));
        }
        if n < self.n_clusters {
            return Err(Error::InsufficientSamples {
                required: self.n_clusters,
                actual: n,
            });
        }

        let merges = self.dendrogram(matrix);
        let mut parent: Vec<usize> = (0..n).collect();
        for merge in merges.iter().take(n - self.n_clusters) {
            let ra = find(&mut parent, merge.a);
            let rb = find(&mut parent, merge.b);
            parent[ra.max(rb)] = ra.min(rb);
        }

        // number clusters by first appearance
        let mut label_of_root = vec![-1i32; n];
        let mut next = 0;
        let labels = (0..n)
            .map(|i| {
                let root = find(&mut parent, i);
                if label_of_root[root] < 0 {
                    label_of_root[root] = next;
                    next += 1;
                }
                label_of_root[root]
            })
            .collect();

        debug!(
            "Agglomerative ({} linkage) cut into {} clusters",
            self.linkage, self.n_clusters
        );
        Ok(labels)
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}
