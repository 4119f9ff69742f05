// Density clustering of projected coordinates

use crate::core::hdbscan::{Hdbscan, NOISE};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors raised by the density clusterer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("empty input: no points to cluster")]
    EmptyInput,

    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        name: &'static str,
        message: &'static str,
    },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("coordinates contain NaN or infinite values")]
    NonFinite,
}

/// Clamp a requested minimum cluster size into `[2, n]`.
///
/// Expects `n >= 2`; below that no clustering happens (see [`cluster_embeddings`]).
pub fn derive_effective_cluster_size(requested: usize, n: usize) -> usize {
    requested.min(n).max(2)
}

/// Assign a density-based cluster label to every point.
///
/// Fewer than two points cannot be clustered: every point gets label 0 and
/// no error is raised. An empty slice gives an empty label vector. This
/// differs from [`Hdbscan::fit_predict`], which labels a lone point [`NOISE`].
/// Otherwise HDBSCAN runs with `min_cluster_size = min_samples` set to the
/// clamped size and its labels, [`NOISE`] included, are returned unchanged.
pub fn cluster_embeddings(points: &[Vec<f32>], min_cluster_size: usize) -> Result<Vec<i32>, ClusterError> {
    let n = points.len();
    if n < 2 {
        return Ok(vec![0; n]);
    }

    let effective = derive_effective_cluster_size(min_cluster_size, n);
    debug!(
        requested = min_cluster_size,
        effective,
        n,
        "clustering with clamped min_cluster_size"
    );

    Hdbscan::new()
        .with_min_cluster_size(effective)
        .with_min_samples(effective)
        .fit_predict(points)
}

/// Number of points per label, noise included
pub fn cluster_sizes(labels: &[i32]) -> BTreeMap<i32, usize> {
    let mut sizes = BTreeMap::new();
    for &label in labels {
        *sizes.entry(label).or_insert(0) += 1;
    }
    sizes
}

/// Indices of the points carrying each label
pub fn cluster_members(labels: &[i32]) -> BTreeMap<i32, Vec<usize>> {
    let mut members: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        members.entry(label).or_default().push(i);
    }
    members
}

pub fn noise_count(labels: &[i32]) -> usize {
    labels.iter().filter(|&&l| l == NOISE).count()
}

/// Distinct non-noise labels
pub fn cluster_count(labels: &[i32]) -> usize {
    cluster_sizes(labels).keys().filter(|&&l| l != NOISE).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn blob(cx: f32, cy: f32, n: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let t = i as f32 * 0.7;
                vec![cx + 0.2 * t.cos() * (1.0 + (i % 3) as f32 * 0.1), cy + 0.2 * t.sin()]
            })
            .collect()
    }

    #[test]
    fn test_clamping_examples() {
        assert_eq!(derive_effective_cluster_size(1, 10), 2);
        assert_eq!(derive_effective_cluster_size(1000, 10), 10);
        assert_eq!(derive_effective_cluster_size(15, 100), 15);
        assert_eq!(derive_effective_cluster_size(0, 2), 2);
    }

    #[test]
    fn test_single_point_is_cluster_zero() {
        let labels = cluster_embeddings(&[vec![0.3, -1.2]], 15).unwrap();
        assert_eq!(labels, vec![0]);
    }

    #[test]
    fn test_single_point_label_differs_from_raw_hdbscan() {
        let point = [vec![0.3, -1.2]];
        let raw = Hdbscan::new().with_min_cluster_size(2).fit_predict(&point).unwrap();
        assert_eq!(raw, vec![NOISE]);
        assert_eq!(cluster_embeddings(&point, 2).unwrap(), vec![0]);
    }

    #[test]
    fn test_empty_input_gives_empty_labels() {
        assert!(cluster_embeddings(&[], 15).unwrap().is_empty());
    }

    #[test]
    fn test_two_blobs() {
        let mut points = blob(0.0, 0.0, 20);
        points.extend(blob(10.0, 10.0, 20));

        let labels = cluster_embeddings(&points, 5).unwrap();
        assert_eq!(labels.len(), 40);
        assert!(cluster_count(&labels) >= 2);

        let first: Vec<i32> = labels[..20].iter().copied().filter(|&l| l != NOISE).collect();
        let second: Vec<i32> = labels[20..].iter().copied().filter(|&l| l != NOISE).collect();
        assert!(first.len() >= 5 && second.len() >= 5);
        // no cluster spans both blobs
        assert!(first.iter().all(|l| !second.contains(l)));
    }

    #[test]
    fn test_oversized_request_does_not_error() {
        let mut points = blob(0.0, 0.0, 6);
        points.extend(blob(5.0, 5.0, 6));
        let labels = cluster_embeddings(&points, 1000).unwrap();
        assert_eq!(labels.len(), 12);
    }

    #[test]
    fn test_undersized_request_does_not_error() {
        let points = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![5.0, 5.0]];
        let labels = cluster_embeddings(&points, 1).unwrap();
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn test_non_finite_is_an_error() {
        let points = vec![vec![0.0, 0.0], vec![f32::INFINITY, 1.0]];
        assert_eq!(cluster_embeddings(&points, 2), Err(ClusterError::NonFinite));
    }

    #[test]
    fn test_cluster_sizes_and_noise() {
        let labels = vec![0, 1, 0, NOISE, 1, 0];
        let sizes = cluster_sizes(&labels);
        assert_eq!(sizes.get(&0), Some(&3));
        assert_eq!(sizes.get(&1), Some(&2));
        assert_eq!(sizes.get(&NOISE), Some(&1));
        assert_eq!(noise_count(&labels), 1);
        assert_eq!(cluster_count(&labels), 2);
    }

    #[test]
    fn test_cluster_members() {
        let labels = vec![0, 1, 0, NOISE, 1, 0];
        let members = cluster_members(&labels);
        assert_eq!(members[&0], vec![0, 2, 5]);
        assert_eq!(members[&1], vec![1, 4]);
        assert_eq!(members[&NOISE], vec![3]);
    }

    proptest! {
        #[test]
        fn prop_effective_size_within_bounds(requested in 0usize..5000, n in 2usize..5000) {
            let effective = derive_effective_cluster_size(requested, n);
            prop_assert!(effective >= 2);
            prop_assert!(effective <= n);
            if (2..=n).contains(&requested) {
                prop_assert_eq!(effective, requested);
            }
        }

        #[test]
        fn prop_labels_match_input_length(n in 2usize..40, requested in 0usize..60) {
            let points: Vec<Vec<f32>> = (0..n)
                .map(|i| vec![(i % 7) as f32, (i / 7) as f32 * 3.0])
                .collect();
            let labels = cluster_embeddings(&points, requested).unwrap();
            prop_assert_eq!(labels.len(), n);
            prop_assert!(labels.iter().all(|&l| l >= NOISE));
        }
    }
}
