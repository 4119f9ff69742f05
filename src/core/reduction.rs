// Dimensionality reduction: UMAP first, PCA when UMAP cannot run

use crate::core::similarity::{all_rows_identical, euclidean_distance, squared_euclidean, validate_embeddings};
use nalgebra::{DMatrix, SymmetricEigen};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on the UMAP neighbourhood size
pub const DEFAULT_N_NEIGHBORS: usize = 15;

// Curve parameters of 1 / (1 + a * d^(2b)) for min_dist = 0.1, spread = 1.0.
const CURVE_A: f32 = 1.576_943_5;
const CURVE_B: f32 = 0.895_060_6;

const NEGATIVE_SAMPLE_RATE: f32 = 5.0;
const GRADIENT_CLIP: f32 = 4.0;
const SMOOTH_K_TOLERANCE: f32 = 1e-5;
const MIN_K_DIST_SCALE: f32 = 1e-3;
const INIT_RANGE: f32 = 10.0;

/// Errors raised by a projector
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReduceError {
    #[error("need at least {required} samples, got {found}")]
    TooFewSamples { required: usize, found: usize },

    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("degenerate input: {0}")]
    Degenerate(String),

    #[error("numerical failure: {0}")]
    Numerical(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMethod {
    Umap,
    Pca,
}

impl fmt::Display for ProjectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionMethod::Umap => f.write_str("UMAP"),
            ProjectionMethod::Pca => f.write_str("PCA"),
        }
    }
}

/// Which branch of the reducer produced the coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProjectionSource {
    Primary,
    Fallback { reason: String },
}

/// Projected coordinates tagged with the method that produced them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reduction {
    pub coordinates: Vec<Vec<f32>>,
    pub method: ProjectionMethod,
    pub source: ProjectionSource,
}

impl Reduction {
    pub fn used_fallback(&self) -> bool {
        matches!(self.source, ProjectionSource::Fallback { .. })
    }
}

/// A deterministic map from N x D rows to N x `n_components` rows
pub trait Projector {
    fn method(&self) -> ProjectionMethod;

    fn fit_transform(
        &self,
        data: &[Vec<f32>],
        n_components: usize,
        seed: u64,
    ) -> Result<Vec<Vec<f32>>, ReduceError>;
}

/// Configuration for dimensionality reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReductionConfig {
    /// Output dimensionality
    pub n_components: usize,
    /// RNG seed shared by both projectors
    pub seed: u64,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        ReductionConfig {
            n_components: 2,
            seed: 42,
        }
    }
}

impl ReductionConfig {
    pub fn new(n_components: usize) -> Self {
        ReductionConfig {
            n_components,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Neighbourhood size for `n_samples` points: never more than the other points available.
pub fn neighbors_for(n_samples: usize) -> usize {
    DEFAULT_N_NEIGHBORS.min(n_samples.saturating_sub(1))
}

/// Project with UMAP, falling back to PCA on any UMAP error.
pub fn reduce_dimensionality(
    embeddings: &[Vec<f32>],
    config: &ReductionConfig,
) -> Result<Reduction, ReduceError> {
    let primary = Umap::new(neighbors_for(embeddings.len()));
    reduce_with(&primary, &Pca, embeddings, config)
}

/// Two-branch strategy: `primary`, then `fallback` if the primary errors.
///
/// A fallback error is returned as is.
pub fn reduce_with(
    primary: &dyn Projector,
    fallback: &dyn Projector,
    embeddings: &[Vec<f32>],
    config: &ReductionConfig,
) -> Result<Reduction, ReduceError> {
    match primary.fit_transform(embeddings, config.n_components, config.seed) {
        Ok(coordinates) => Ok(Reduction {
            coordinates,
            method: primary.method(),
            source: ProjectionSource::Primary,
        }),
        Err(err) => {
            warn!(
                reason = %err,
                "{} failed ({}), falling back to {}",
                primary.method(),
                err,
                fallback.method()
            );
            let coordinates = fallback.fit_transform(embeddings, config.n_components, config.seed)?;
            Ok(Reduction {
                coordinates,
                method: fallback.method(),
                source: ProjectionSource::Fallback {
                    reason: err.to_string(),
                },
            })
        }
    }
}

fn check_input(data: &[Vec<f32>]) -> Result<usize, ReduceError> {
    if data.is_empty() {
        return Err(ReduceError::InvalidInput("empty input".to_string()));
    }
    let report = validate_embeddings(data, None);
    if !report.valid {
        return Err(ReduceError::InvalidInput(report.issues.join("; ")));
    }
    let dim = report.dimension.unwrap_or(0);
    if dim == 0 {
        return Err(ReduceError::InvalidInput("rows have dimension 0".to_string()));
    }
    Ok(dim)
}

// ---------------------------------------------------------------------------
// UMAP
// ---------------------------------------------------------------------------

/// Uniform Manifold Approximation and Projection (McInnes, Healy, Melville 2018).
///
/// Exact kNN graph, fuzzy simplicial set with union symmetrisation, random
/// initialisation and negative-sampling SGD. Single threaded, so a fixed seed
/// gives bit-identical output.
#[derive(Debug, Clone)]
pub struct Umap {
    n_neighbors: usize,
    n_epochs: Option<usize>,
    learning_rate: f32,
}

impl Umap {
    /// `n_neighbors` counts the point itself, so it must be at least 2.
    pub fn new(n_neighbors: usize) -> Self {
        Umap {
            n_neighbors,
            n_epochs: None,
            learning_rate: 1.0,
        }
    }

    /// Override the epoch count (500 for up to 10k points, 200 above)
    pub fn with_n_epochs(mut self, n_epochs: usize) -> Self {
        self.n_epochs = Some(n_epochs);
        self
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }
}

impl Projector for Umap {
    fn method(&self) -> ProjectionMethod {
        ProjectionMethod::Umap
    }

    fn fit_transform(
        &self,
        data: &[Vec<f32>],
        n_components: usize,
        seed: u64,
    ) -> Result<Vec<Vec<f32>>, ReduceError> {
        let n = data.len();
        if n < 2 {
            return Err(ReduceError::TooFewSamples { required: 2, found: n });
        }
        if self.n_neighbors < 2 {
            return Err(ReduceError::InvalidParameter {
                name: "n_neighbors",
                message: format!("must be greater than 1, got {}", self.n_neighbors),
            });
        }
        if n_components == 0 {
            return Err(ReduceError::InvalidParameter {
                name: "n_components",
                message: "must be at least 1".to_string(),
            });
        }
        check_input(data)?;
        if all_rows_identical(data) {
            return Err(ReduceError::Degenerate(
                "all samples are identical, neighbourhoods have zero extent".to_string(),
            ));
        }

        let k = self.n_neighbors.min(n);
        let n_epochs = self
            .n_epochs
            .unwrap_or(if n <= 10_000 { 500 } else { 200 });
        debug!(n, k, n_components, n_epochs, "fitting UMAP");

        let (knn_indices, knn_dists) = nearest_neighbors(data, k);
        let (sigmas, rhos) = smooth_knn_dist(&knn_dists, k);
        let edges = fuzzy_simplicial_set(&knn_indices, &knn_dists, &sigmas, &rhos);
        if edges.is_empty() {
            return Err(ReduceError::Degenerate("neighbour graph has no edges".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut embedding: Vec<f32> = (0..n * n_components)
            .map(|_| rng.random_range(-INIT_RANGE..INIT_RANGE))
            .collect();

        optimize_layout(
            &mut embedding,
            n,
            n_components,
            &edges,
            n_epochs,
            self.learning_rate,
            &mut rng,
        );

        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(ReduceError::Numerical(
                "layout optimisation produced non-finite coordinates".to_string(),
            ));
        }

        Ok(embedding
            .chunks(n_components)
            .map(|row| row.to_vec())
            .collect())
    }
}

/// Exact k nearest neighbours (self included), sorted by distance then index.
fn nearest_neighbors(data: &[Vec<f32>], k: usize) -> (Vec<Vec<usize>>, Vec<Vec<f32>>) {
    let n = data.len();
    let mut indices = Vec::with_capacity(n);
    let mut dists = Vec::with_capacity(n);

    let mut row: Vec<(f32, usize)> = Vec::with_capacity(n);
    for i in 0..n {
        row.clear();
        row.extend((0..n).map(|j| {
            let d = if i == j { 0.0 } else { euclidean_distance(&data[i], &data[j]) };
            (d, j)
        }));
        // self first, then by distance
        let order = |a: &(f32, usize), b: &(f32, usize)| {
            (a.1 != i)
                .cmp(&(b.1 != i))
                .then(a.0.total_cmp(&b.0))
                .then(a.1.cmp(&b.1))
        };
        if k < n {
            row.select_nth_unstable_by(k - 1, order);
            row.truncate(k);
        }
        row.sort_by(order);

        indices.push(row.iter().map(|&(_, j)| j).collect());
        dists.push(row.iter().map(|&(d, _)| d).collect());
    }
    (indices, dists)
}

/// Per-point `sigma` and `rho` so that the membership strengths sum to log2(k).
fn smooth_knn_dist(knn_dists: &[Vec<f32>], k: usize) -> (Vec<f32>, Vec<f32>) {
    let target = (k as f32).log2();
    let n = knn_dists.len();

    let total: f64 = knn_dists.iter().flatten().map(|&d| f64::from(d)).sum();
    let mean_all = (total / (n * k) as f64) as f32;

    let mut sigmas = Vec::with_capacity(n);
    let mut rhos = Vec::with_capacity(n);

    for dists in knn_dists {
        let rho = dists.iter().copied().find(|&d| d > 0.0).unwrap_or(0.0);

        let mut lo = 0.0f32;
        let mut hi = f32::INFINITY;
        let mut mid = 1.0f32;
        for _ in 0..64 {
            let psum: f32 = dists[1..]
                .iter()
                .map(|&d| {
                    let gap = d - rho;
                    if gap > 0.0 { (-gap / mid).exp() } else { 1.0 }
                })
                .sum();

            if (psum - target).abs() < SMOOTH_K_TOLERANCE {
                break;
            }
            if psum > target {
                hi = mid;
                mid = (lo + hi) / 2.0;
            } else {
                lo = mid;
                mid = if hi.is_infinite() { mid * 2.0 } else { (lo + hi) / 2.0 };
            }
        }

        let mean_ith = dists.iter().sum::<f32>() / dists.len() as f32;
        let floor = if rho > 0.0 { mean_ith } else { mean_all };
        sigmas.push(mid.max(MIN_K_DIST_SCALE * floor));
        rhos.push(rho);
    }
    (sigmas, rhos)
}

/// Directed memberships combined with the probabilistic union `a + b - ab`.
///
/// Returns both directions of every edge, ordered by (head, tail).
fn fuzzy_simplicial_set(
    knn_indices: &[Vec<usize>],
    knn_dists: &[Vec<f32>],
    sigmas: &[f32],
    rhos: &[f32],
) -> Vec<(usize, usize, f32)> {
    // (low, high) -> (w low->high, w high->low)
    let mut pairs: BTreeMap<(usize, usize), (f32, f32)> = BTreeMap::new();

    for (i, (neighbors, dists)) in knn_indices.iter().zip(knn_dists.iter()).enumerate() {
        for (&j, &d) in neighbors.iter().zip(dists.iter()) {
            if j == i {
                continue;
            }
            let gap = d - rhos[i];
            let w = if gap <= 0.0 || sigmas[i] == 0.0 {
                1.0
            } else {
                (-gap / sigmas[i]).exp()
            };
            let entry = pairs.entry((i.min(j), i.max(j))).or_insert((0.0, 0.0));
            if i < j {
                entry.0 = w;
            } else {
                entry.1 = w;
            }
        }
    }

    let mut edges = Vec::with_capacity(pairs.len() * 2);
    for (&(u, v), &(a, b)) in &pairs {
        let w = a + b - a * b;
        if w > 0.0 {
            edges.push((u, v, w));
            edges.push((v, u, w));
        }
    }
    edges.sort_by(|x, y| x.0.cmp(&y.0).then(x.1.cmp(&y.1)));
    edges
}

#[inline]
fn clip(v: f32) -> f32 {
    v.clamp(-GRADIENT_CLIP, GRADIENT_CLIP)
}

fn optimize_layout(
    embedding: &mut [f32],
    n: usize,
    dim: usize,
    edges: &[(usize, usize, f32)],
    n_epochs: usize,
    initial_alpha: f32,
    rng: &mut StdRng,
) {
    let max_w = edges.iter().map(|e| e.2).fold(0.0f32, f32::max);
    // edges too weak to be sampled even once are dropped
    let active: Vec<&(usize, usize, f32)> = edges
        .iter()
        .filter(|e| e.2 >= max_w / n_epochs as f32)
        .collect();

    let epochs_per_sample: Vec<f32> = active.iter().map(|e| max_w / e.2).collect();
    let epochs_per_negative: Vec<f32> = epochs_per_sample
        .iter()
        .map(|e| e / NEGATIVE_SAMPLE_RATE)
        .collect();
    let mut next_sample = epochs_per_sample.clone();
    let mut next_negative = epochs_per_negative.clone();

    let (a, b) = (CURVE_A, CURVE_B);

    for epoch in 0..n_epochs {
        let alpha = initial_alpha * (1.0 - epoch as f32 / n_epochs as f32);
        let now = epoch as f32;

        for (e, &&(head, tail, _)) in active.iter().enumerate() {
            if next_sample[e] > now {
                continue;
            }

            let dist2 = squared_euclidean(
                &embedding[head * dim..(head + 1) * dim],
                &embedding[tail * dim..(tail + 1) * dim],
            );
            let coeff = if dist2 > 0.0 {
                -2.0 * a * b * dist2.powf(b - 1.0) / (a * dist2.powf(b) + 1.0)
            } else {
                0.0
            };
            for d in 0..dim {
                let diff = embedding[head * dim + d] - embedding[tail * dim + d];
                let grad = clip(coeff * diff);
                embedding[head * dim + d] += grad * alpha;
                embedding[tail * dim + d] -= grad * alpha;
            }
            next_sample[e] += epochs_per_sample[e];

            let n_negative = ((now - next_negative[e]) / epochs_per_negative[e]).floor().max(0.0) as usize;
            for _ in 0..n_negative {
                let other = rng.random_range(0..n);
                if other == head {
                    continue;
                }
                let dist2 = squared_euclidean(
                    &embedding[head * dim..(head + 1) * dim],
                    &embedding[other * dim..(other + 1) * dim],
                );
                let coeff = if dist2 > 0.0 {
                    2.0 * b / ((0.001 + dist2) * (a * dist2.powf(b) + 1.0))
                } else {
                    0.0
                };
                for d in 0..dim {
                    let grad = if coeff > 0.0 {
                        clip(coeff * (embedding[head * dim + d] - embedding[other * dim + d]))
                    } else {
                        GRADIENT_CLIP
                    };
                    embedding[head * dim + d] += grad * alpha;
                }
            }
            next_negative[e] += n_negative as f32 * epochs_per_negative[e];
        }
    }
}

// ---------------------------------------------------------------------------
// PCA
// ---------------------------------------------------------------------------

/// Principal component analysis by eigendecomposition of the covariance matrix.
///
/// Exact, so the seed is not used. Component signs are fixed (largest loading
/// positive) to keep the output stable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pca;

impl Projector for Pca {
    fn method(&self) -> ProjectionMethod {
        ProjectionMethod::Pca
    }

    fn fit_transform(
        &self,
        data: &[Vec<f32>],
        n_components: usize,
        _seed: u64,
    ) -> Result<Vec<Vec<f32>>, ReduceError> {
        let n = data.len();
        let dim = check_input(data)?;
        if n_components == 0 || n_components > dim {
            return Err(ReduceError::InvalidParameter {
                name: "n_components",
                message: format!("must be between 1 and {}, got {}", dim, n_components),
            });
        }
        debug!(n, dim, n_components, "fitting PCA");

        let mut mean = vec![0.0f64; dim];
        for row in data {
            for (m, &v) in mean.iter_mut().zip(row.iter()) {
                *m += f64::from(v);
            }
        }
        for m in &mut mean {
            *m /= n as f64;
        }

        let centered = DMatrix::from_fn(n, dim, |i, j| f64::from(data[i][j]) - mean[j]);
        let cov = (centered.transpose() * &centered) / (n.saturating_sub(1).max(1) as f64);
        let eigen = SymmetricEigen::new(cov);

        let mut order: Vec<usize> = (0..dim).collect();
        order.sort_by(|&x, &y| {
            eigen.eigenvalues[y]
                .total_cmp(&eigen.eigenvalues[x])
                .then(x.cmp(&y))
        });

        let mut components: Vec<Vec<f64>> = Vec::with_capacity(n_components);
        for &idx in order.iter().take(n_components) {
            let mut v: Vec<f64> = eigen.eigenvectors.column(idx).iter().copied().collect();
            let pivot = v
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()).then(b.0.cmp(&a.0)))
                .map(|(_, &x)| x)
                .unwrap_or(0.0);
            if pivot < 0.0 {
                for x in &mut v {
                    *x = -*x;
                }
            }
            components.push(v);
        }

        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let row = centered.row(i);
            let projected: Vec<f32> = components
                .iter()
                .map(|c| row.iter().zip(c.iter()).map(|(x, w)| x * w).sum::<f64>() as f32)
                .collect();
            out.push(projected);
        }

        if out.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ReduceError::Numerical(
                "projection produced non-finite coordinates".to_string(),
            ));
        }
        Ok(out)
    }
}
