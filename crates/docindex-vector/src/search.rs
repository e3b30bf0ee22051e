//! Exact top-k over a flat vector buffer.
//!
//! Every stored vector is scored; a bounded max-heap keeps the `k` best
//! `(distance, position)` pairs, so equal distances resolve to the lower
//! position and the result never depends on scan order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use docindex_core::Metric;

#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.position.cmp(&other.position))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The `k` nearest rows of `data` (row-major, `dim` wide) to `query`,
/// ascending by distance then position.
pub fn top_k(metric: Metric, data: &[f32], dim: usize, query: &[f32], k: usize) -> Vec<Neighbor> {
    if dim == 0 {
        return Vec::new();
    }
    let k = k.min(data.len() / dim);
    let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k);
    for (position, row) in data.chunks_exact(dim).enumerate() {
        let candidate = Neighbor { position, distance: metric.distance(row, query) };
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek() {
            if candidate < *worst {
                heap.pop();
                heap.push(candidate);
            }
        }
    }
    heap.into_sorted_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(hits: &[Neighbor]) -> Vec<usize> {
        hits.iter().map(|n| n.position).collect()
    }

    #[test]
    fn nearest_first() {
        let data = [0.0, 0.0, 5.0, 5.0, 1.0, 1.0, -3.0, 0.0];
        let hits = top_k(Metric::SquaredL2, &data, 2, &[0.9, 0.9], 3);
        assert_eq!(positions(&hits), vec![2, 0, 3]);
        assert!((hits[0].distance - 0.02).abs() < 1e-5);
    }

    #[test]
    fn equal_distances_keep_scan_position_order() {
        // four points on the unit circle around the query
        let data = [1.0, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, -1.0];
        for k in 1..=4 {
            let hits = top_k(Metric::SquaredL2, &data, 2, &[0.0, 0.0], k);
            assert_eq!(positions(&hits), (0..k).collect::<Vec<_>>());
        }
    }

    #[test]
    fn k_larger_than_corpus_returns_everything_sorted() {
        let data = [3.0, 1.0, 2.0];
        let hits = top_k(Metric::SquaredL2, &data, 1, &[0.0], 10);
        assert_eq!(positions(&hits), vec![1, 2, 0]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn huge_k_is_capped_at_row_count() {
        let data = [3.0, 1.0, 2.0];
        for k in [usize::MAX, 1 << 60] {
            let hits = top_k(Metric::SquaredL2, &data, 1, &[0.0], k);
            assert_eq!(positions(&hits), vec![1, 2, 0]);
        }
    }

    #[test]
    fn zero_k_is_empty() {
        assert!(top_k(Metric::SquaredL2, &[1.0], 1, &[1.0], 0).is_empty());
    }
}
