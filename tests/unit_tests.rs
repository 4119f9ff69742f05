// tests/unit_tests.rs
//
// Shape, clamping and determinism properties of the reducer and clusterer

use proptest::prelude::*;
use review_insights::{
    cluster_embeddings, derive_effective_cluster_size, neighbors_for, reduce_dimensionality, reduce_with,
    Pca, ProjectionMethod, Projector, ReduceError, ReductionConfig, Umap,
};

fn grid(n: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|i| (0..dim).map(|d| ((i * (d + 3)) % 7) as f32 + i as f32 * 0.1).collect())
        .collect()
}

#[test]
fn test_clamping_examples() {
    assert_eq!(derive_effective_cluster_size(1, 10), 2);
    assert_eq!(derive_effective_cluster_size(1000, 10), 10);
}

#[test]
fn test_single_point_label_is_zero() {
    assert_eq!(cluster_embeddings(&[vec![1.0, 1.0]], 15).unwrap(), vec![0]);
}

#[test]
fn test_identical_vectors_force_fallback() {
    let data = vec![vec![0.1f32; 12]; 8];
    let config = ReductionConfig::default();
    let reduction = reduce_dimensionality(&data, &config).unwrap();

    assert!(reduction.used_fallback());
    assert_eq!(reduction.method, ProjectionMethod::Pca);
    assert_eq!(reduction.coordinates, Pca.fit_transform(&data, 2, 42).unwrap());
}

#[test]
fn test_two_points_use_fallback() {
    // one neighbour besides itself is too few for UMAP
    let data = grid(2, 4);
    let reduction = reduce_dimensionality(&data, &ReductionConfig::new(1)).unwrap();
    assert!(reduction.used_fallback());
    assert_eq!(reduction.coordinates.len(), 2);
}

#[test]
fn test_umap_determinism_depends_on_seed() {
    let data = grid(30, 5);
    let umap = Umap::new(neighbors_for(30)).with_n_epochs(100);
    let a = umap.fit_transform(&data, 2, 42).unwrap();
    let b = umap.fit_transform(&data, 2, 42).unwrap();
    let c = umap.fit_transform(&data, 2, 7).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

struct Broken;

impl Projector for Broken {
    fn method(&self) -> ProjectionMethod {
        ProjectionMethod::Umap
    }

    fn fit_transform(&self, _: &[Vec<f32>], _: usize, _: u64) -> Result<Vec<Vec<f32>>, ReduceError> {
        Err(ReduceError::Numerical("spectral layout diverged".to_string()))
    }
}

#[test]
fn test_both_paths_failing_is_fatal() {
    let err = reduce_with(&Broken, &Broken, &grid(5, 3), &ReductionConfig::default()).unwrap_err();
    assert!(matches!(err, ReduceError::Numerical(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_neighbors_never_exceed_other_points(n in 1usize..100_000) {
        let k = neighbors_for(n);
        prop_assert!(k <= n - 1);
        prop_assert!(k <= 15);
    }

    #[test]
    fn prop_reducer_returns_n_by_k(
        rows in prop::collection::vec(prop::collection::vec(-5.0f32..5.0, 6), 2..14),
        k in 1usize..4,
    ) {
        let n = rows.len();
        let k = k.min(n - 1);
        let reduction = reduce_dimensionality(&rows, &ReductionConfig::new(k)).unwrap();
        prop_assert_eq!(reduction.coordinates.len(), n);
        prop_assert!(reduction.coordinates.iter().all(|r| r.len() == k));
    }

    #[test]
    fn prop_effective_size_in_range(requested in 0usize..10_000, n in 2usize..10_000) {
        let size = derive_effective_cluster_size(requested, n);
        prop_assert!((2..=n).contains(&size));
    }
}
