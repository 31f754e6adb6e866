//! HDBSCAN: hierarchical density-based clustering
//!
//! 1. Core distance of every point (distance to its `min_samples`-th
//!    nearest neighbour, the point itself counted)
//! 2. Minimum spanning tree over mutual reachability distances (Prim)
//! 3. Single linkage tree from the sorted MST edges (union-find)
//! 4. Condensed tree: splits where both sides hold at least
//!    `min_cluster_size` points create new clusters, smaller sides fall out
//! 5. Excess-of-mass selection of the most stable clusters; the root is
//!    never selected, so a single cluster cannot swallow the dataset
//!
//! Selected clusters are labelled 0.. in ascending condensed-tree order.

use crate::executor::Clusterer;
use clustx_core::distance::euclidean;
use clustx_core::{Error, FeatureMatrix, Result, NOISE};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Smallest distance used when converting distances to densities
const MIN_DISTANCE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct Hdbscan {
    min_cluster_size: usize,
    min_samples: usize,
}

#[derive(Debug, Clone, Copy)]
struct MstEdge {
    left: usize,
    right: usize,
    distance: f64,
}

/// Merge in the single linkage tree; node `n + i` is created by merge `i`
#[derive(Debug, Clone, Copy)]
struct SltNode {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

/// Edge of the condensed tree: `child` (a point below `n` or a cluster id
/// at or above `n`) leaves `parent` at density `lambda`
#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: usize,
    lambda: f64,
    size: usize,
}

impl Hdbscan {
    pub fn new(min_cluster_size: usize, min_samples: usize) -> Self {
        Self {
            min_cluster_size,
            min_samples,
        }
    }

    fn core_distances(&self, matrix: &FeatureMatrix) -> Vec<f64> {
        let n = matrix.n_rows();
        let k = self.min_samples.min(n).max(1);
        (0..n)
            .into_par_iter()
            .map(|i| {
                let a = matrix.row(i);
                let mut dists: Vec<f64> = matrix.rows().map(|b| euclidean(a, b)).collect();
                let (_, kth, _) = dists.select_nth_unstable_by(k - 1, |x, y| x.total_cmp(y));
                *kth
            })
            .collect()
    }

    fn minimum_spanning_tree(&self, matrix: &FeatureMatrix, core: &[f64]) -> Vec<MstEdge> {
        let n = matrix.n_rows();
        let mut in_tree = vec![false; n];
        let mut best = vec![f64::INFINITY; n];
        let mut best_from = vec![0usize; n];
        let mut edges = Vec::with_capacity(n.saturating_sub(1));

        let mut current = 0;
        in_tree[0] = true;
        for _ in 1..n {
            let row = matrix.row(current);
            let mut next = usize::MAX;
            let mut next_dist = f64::INFINITY;
            for j in 0..n {
                if in_tree[j] {
                    continue;
                }
                let mrd = euclidean(row, matrix.row(j)).max(core[current]).max(core[j]);
                if mrd < best[j] {
                    best[j] = mrd;
                    best_from[j] = current;
                }
                if best[j] < next_dist {
                    next_dist = best[j];
                    next = j;
                }
            }
            in_tree[next] = true;
            edges.push(MstEdge {
                left: best_from[next],
                right: next,
                distance: next_dist,
            });
            current = next;
        }

        edges.sort_by_key(|e| OrderedFloat(e.distance));
        edges
    }

    fn single_linkage_tree(&self, n: usize, mst: &[MstEdge]) -> Vec<SltNode> {
        let mut uf = UnionFind::new(n);
        mst.iter()
            .map(|edge| {
                let left = uf.find(edge.left);
                let right = uf.find(edge.right);
                let size = uf.size(left) + uf.size(right);
                uf.union(left, right);
                SltNode {
                    left,
                    right,
                    distance: edge.distance,
                    size,
                }
            })
            .collect()
    }

    fn condense(&self, n: usize, slt: &[SltNode]) -> Vec<CondensedEdge> {
        let root = 2 * n - 2;
        let node_size = |id: usize| if id < n { 1 } else { slt[id - n].size };

        let mut relabel = vec![0usize; root + 1];
        relabel[root] = n;
        let mut next_cluster = n + 1;
        let mut ignore = vec![false; root + 1];
        let mut condensed = Vec::new();

        for node in bfs(root, n, slt) {
            if node < n || ignore[node] {
                continue;
            }
            let SltNode {
                left,
                right,
                distance,
                ..
            } = slt[node - n];
            let lambda = 1.0 / distance.max(MIN_DISTANCE);
            let parent = relabel[node];
            let left_big = node_size(left) >= self.min_cluster_size;
            let right_big = node_size(right) >= self.min_cluster_size;

            match (left_big, right_big) {
                (true, true) => {
                    for child in [left, right] {
                        relabel[child] = next_cluster;
                        condensed.push(CondensedEdge {
                            parent,
                            child: next_cluster,
                            lambda,
                            size: node_size(child),
                        });
                        next_cluster += 1;
                    }
                }
                (true, false) | (false, true) => {
                    let (big, small) = if left_big { (left, right) } else { (right, left) };
                    relabel[big] = parent;
                    fall_out(small, parent, lambda, n, slt, &mut ignore, &mut condensed);
                }
                (false, false) => {
                    fall_out(left, parent, lambda, n, slt, &mut ignore, &mut condensed);
                    fall_out(right, parent, lambda, n, slt, &mut ignore, &mut condensed);
                }
            }
        }
        condensed
    }

    /// Excess-of-mass selection over the condensed tree
    fn select_clusters(&self, n: usize, condensed: &[CondensedEdge]) -> BTreeSet<usize> {
        let mut birth: BTreeMap<usize, f64> = BTreeMap::new();
        birth.insert(n, 0.0);
        for edge in condensed.iter().filter(|e| e.child >= n) {
            birth.insert(edge.child, edge.lambda);
        }

        let mut stability: BTreeMap<usize, f64> = birth.keys().map(|&c| (c, 0.0)).collect();
        let mut children: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for edge in condensed {
            if let (Some(s), Some(b)) = (stability.get_mut(&edge.parent), birth.get(&edge.parent)) {
                *s += (edge.lambda - b) * edge.size as f64;
            }
            if edge.child >= n {
                children.entry(edge.parent).or_default().push(edge.child);
            }
        }

        let mut selected: BTreeSet<usize> = BTreeSet::new();
        // children always carry larger ids than their parent
        for (&cluster, s) in stability.clone().iter().rev() {
            if cluster == n {
                continue;
            }
            let kids = children.get(&cluster).map(Vec::as_slice).unwrap_or(&[]);
            let subtree: f64 = kids.iter().filter_map(|c| stability.get(c)).sum();
            if *s >= subtree {
                selected.insert(cluster);
                for descendant in descendants(cluster, &children) {
                    selected.remove(&descendant);
                }
            } else {
                stability.insert(cluster, subtree);
            }
        }
        selected
    }

    fn label(&self, n: usize, condensed: &[CondensedEdge], selected: &BTreeSet<usize>) -> Vec<i32> {
        let mut parent_of: BTreeMap<usize, usize> = BTreeMap::new();
        for edge in condensed {
            parent_of.insert(edge.child, edge.parent);
        }
        let cluster_label: BTreeMap<usize, i32> = selected
            .iter()
            .enumerate()
            .map(|(label, &cluster)| (cluster, label as i32))
            .collect();

        (0..n)
            .map(|point| {
                let mut node = point;
                while let Some(&parent) = parent_of.get(&node) {
                    if let Some(&label) = cluster_label.get(&parent) {
                        return label;
                    }
                    node = parent;
                }
                NOISE
            })
            .collect()
    }
}

impl Clusterer for Hdbscan {
    fn fit_predict(&self, matrix: &FeatureMatrix) -> Result<Vec<i32>> {
        let n = matrix.n_rows();
        if self.min_cluster_size < 2 || self.min_samples == 0 {
            return Err(Error::ClusteringExecution(format!(
                "invalid HDBSCAN parameters min_cluster_size={} min_samples={}",
                self.min_cluster_size, self.min_samples
            )));
        }
        if n < self.min_cluster_size {
            return Err(Error::InsufficientSamples {
                required: self.min_cluster_size,
                actual: n,
            });
        }

        let core = self.core_distances(matrix);
        let mst = self.minimum_spanning_tree(matrix, &core);
        let slt = self.single_linkage_tree(n, &mst);
        let condensed = self.condense(n, &slt);
        let selected = self.select_clusters(n, &condensed);
        let labels = self.label(n, &condensed, &selected);

        debug!(
            "HDBSCAN min_cluster_size={} min_samples={} selected {} clusters, {} noise points",
            self.min_cluster_size,
            self.min_samples,
            selected.len(),
            labels.iter().filter(|&&l| l == NOISE).count()
        );
        Ok(labels)
    }
}

/// Single linkage nodes below `root`, breadth first, `root` included
fn bfs(root: usize, n: usize, slt: &[SltNode]) -> Vec<usize> {
    let mut order = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        if node >= n {
            let SltNode { left, right, .. } = slt[node - n];
            queue.push_back(left);
            queue.push_back(right);
        }
    }
    order
}

/// Every point below `node` leaves `parent` at `lambda`
fn fall_out(
    node: usize,
    parent: usize,
    lambda: f64,
    n: usize,
    slt: &[SltNode],
    ignore: &mut [bool],
    condensed: &mut Vec<CondensedEdge>,
) {
    for sub in bfs(node, n, slt) {
        if sub < n {
            condensed.push(CondensedEdge {
                parent,
                child: sub,
                lambda,
                size: 1,
            });
        }
        ignore[sub] = true;
    }
}

fn descendants(cluster: usize, children: &BTreeMap<usize, Vec<usize>>) -> Vec<usize> {
    let mut out = Vec::new();
    let mut queue = VecDeque::from([cluster]);
    while let Some(c) = queue.pop_front() {
        if let Some(kids) = children.get(&c) {
            for &kid in kids {
                out.push(kid);
                queue.push_back(kid);
            }
        }
    }
    out
}

/// Union-find over `2n - 1` single linkage nodes; each union creates the next node id
struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
    next: usize,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        let total = 2 * n - 1;
        let mut size = vec![0; total];
        size[..n].iter_mut().for_each(|s| *s = 1);
        Self {
            parent: (0..total).collect(),
            size,
            next: n,
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    fn size(&self, x: usize) -> usize {
        self.size[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let node = self.next;
        self.parent[a] = node;
        self.parent[b] = node;
        self.size[node] = self.size[a] + self.size[b];
        self.next += 1;
    }
}
