// Distance kernels for feature rows
// Scalar code with two accumulators for better pipelining; feature rows are
// short (tens of columns) so the win from explicit intrinsics is negligible.

use crate::FeatureMatrix;
use rayon::prelude::*;

/// Squared Euclidean distance
#[inline]
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum0 = 0.0f64;
    let mut sum1 = 0.0f64;

    let chunks = a.chunks_exact(4);
    let remainder = chunks.remainder();
    let b_chunks = b.chunks_exact(4);

    for (a_chunk, b_chunk) in chunks.zip(b_chunks) {
        let d0 = a_chunk[0] - b_chunk[0];
        let d1 = a_chunk[1] - b_chunk[1];
        let d2 = a_chunk[2] - b_chunk[2];
        let d3 = a_chunk[3] - b_chunk[3];

        sum0 += d0 * d0 + d1 * d1;
        sum1 += d2 * d2 + d3 * d3;
    }

    for i in (a.len() - remainder.len())..a.len() {
        let diff = a[i] - b[i];
        sum0 += diff * diff;
    }

    sum0 + sum1
}

/// Euclidean distance
#[inline]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Dot product
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot0 = 0.0f64;
    let mut dot1 = 0.0f64;

    let chunks = a.chunks_exact(4);
    let remainder = chunks.remainder();
    let b_chunks = b.chunks_exact(4);

    for (a_chunk, b_chunk) in chunks.zip(b_chunks) {
        dot0 += a_chunk[0] * b_chunk[0] + a_chunk[1] * b_chunk[1];
        dot1 += a_chunk[2] * b_chunk[2] + a_chunk[3] * b_chunk[3];
    }

    for i in (a.len() - remainder.len())..a.len() {
        dot0 += a[i] * b[i];
    }

    dot0 + dot1
}

/// Full n x n Euclidean distance matrix, row-major.
///
/// Memory is O(n^2); only used by algorithms that need random access to
/// every pair (agglomerative linkage).
pub fn pairwise_euclidean(matrix: &FeatureMatrix) -> Vec<f64> {
    let n = matrix.n_rows();
    let mut out = vec![0.0; n * n];
    out.par_chunks_mut(n.max(1))
        .enumerate()
        .for_each(|(i, row_out)| {
            let a = matrix.row(i);
            for (j, d) in row_out.iter_mut().enumerate() {
                if i != j {
                    *d = euclidean(a, matrix.row(j));
                }
            }
        });
    out
}

/// Index and squared distance of the closest center
#[inline]
pub fn nearest_center(point: &[f64], centers: &[Vec<f64>]) -> (usize, f64) {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, center) in centers.iter().enumerate() {
        let d = squared_euclidean(point, center);
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    (best, best_dist)
}
