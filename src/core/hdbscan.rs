//! HDBSCAN: Hierarchical Density-Based Spatial Clustering of Applications with Noise.
//!
//! HDBSCAN (Campello, Moulavi, Sander 2013) removes DBSCAN's global epsilon and
//! instead builds a hierarchy of density-based clusters, keeping the most
//! stable ones.
//!
//! # Algorithm Outline
//!
//! 1. **Core distance**: distance to the k-th nearest neighbour (k = `min_samples`).
//! 2. **Mutual reachability**: `mrd(i, j) = max(core[i], core[j], dist(i, j))`.
//! 3. **MST** over mutual reachability distances (Prim, O(n^2), distances are
//!    computed on the fly so memory stays O(n)).
//! 4. **Condensed tree**: MST edges are merged in ascending order; components
//!    below `min_cluster_size` fall out of their parent as points rather than
//!    forming a split.
//! 5. **Excess-of-mass selection**: a cluster is kept when its stability beats
//!    the summed stability of its selected descendants.
//! 6. Points outside every selected cluster get [`NOISE`].
//!
//! The root of the hierarchy (everything in one cluster) is only selectable
//! with [`Hdbscan::allow_single_cluster`].
//!
//! # References
//!
//! Campello, R. J. G. B., Moulavi, D., Sander, J. (2013). "Density-Based Clustering
//! Based on Hierarchical Density Estimates." PAKDD 2013.

use crate::core::clustering::ClusterError;
use crate::core::similarity::euclidean_distance;

/// Label given to points that belong to no cluster
pub const NOISE: i32 = -1;

// Merge distances are floored here so lambda = 1 / distance stays finite.
const MIN_DISTANCE: f64 = 1e-12;

/// HDBSCAN clustering algorithm.
#[derive(Debug, Clone)]
pub struct Hdbscan {
    min_samples: usize,
    min_cluster_size: usize,
    allow_single_cluster: bool,
}

impl Hdbscan {
    /// Defaults: `min_samples = 5`, `min_cluster_size = 5`, no single cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `min_samples` (k for core distance computation).
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Set `min_cluster_size` (minimum points for a cluster to persist).
    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }

    /// Let the root cluster be selected, so one all-encompassing cluster is a valid answer.
    pub fn allow_single_cluster(mut self, allow: bool) -> Self {
        self.allow_single_cluster = allow;
        self
    }

    pub fn min_cluster_size(&self) -> usize {
        self.min_cluster_size
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Fit and return one label per point, [`NOISE`] for unassigned points.
    ///
    /// A single point can never reach `min_cluster_size`, so it is labelled
    /// [`NOISE`]. [`cluster_embeddings`](crate::core::clustering::cluster_embeddings)
    /// does not get here for N < 2 and labels such input 0 instead.
    pub fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<i32>, ClusterError> {
        let n = data.len();
        if n == 0 {
            return Err(ClusterError::EmptyInput);
        }

        if self.min_samples == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "min_samples",
                message: "must be at least 1",
            });
        }

        if self.min_cluster_size < 2 {
            return Err(ClusterError::InvalidParameter {
                name: "min_cluster_size",
                message: "must be at least 2",
            });
        }

        let d = data[0].len();
        if d == 0 {
            return Err(ClusterError::InvalidParameter {
                name: "dimension",
                message: "must be at least 1",
            });
        }
        for point in data.iter().skip(1) {
            if point.len() != d {
                return Err(ClusterError::DimensionMismatch {
                    expected: d,
                    found: point.len(),
                });
            }
        }
        if data.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ClusterError::NonFinite);
        }

        if n == 1 {
            return Ok(vec![NOISE]);
        }

        let core = core_distances(data, self.min_samples);
        let mut mst = prim_mst(n, |i, j| {
            mutual_reachability(euclidean_distance(&data[i], &data[j]), core[i], core[j])
        });
        mst.sort_by(|a, b| a.2.total_cmp(&b.2));

        Ok(extract_clusters(
            &mst,
            n,
            self.min_cluster_size,
            self.allow_single_cluster,
        ))
    }

    /// Same as [`fit_predict`](Self::fit_predict) with noise as `None`.
    pub fn fit_predict_with_noise(&self, data: &[Vec<f32>]) -> Result<Vec<Option<usize>>, ClusterError> {
        let labels = self.fit_predict(data)?;
        Ok(labels
            .into_iter()
            .map(|l| usize::try_from(l).ok())
            .collect())
    }
}

impl Default for Hdbscan {
    fn default() -> Self {
        Self {
            min_samples: 5,
            min_cluster_size: 5,
            allow_single_cluster: false,
        }
    }
}

fn core_distances(data: &[Vec<f32>], min_samples: usize) -> Vec<f32> {
    let n = data.len();
    let k = min_samples.min(n - 1).max(1);
    let mut row: Vec<f32> = Vec::with_capacity(n - 1);
    let mut core = Vec::with_capacity(n);
    for i in 0..n {
        row.clear();
        row.extend(
            (0..n)
                .filter(|&j| j != i)
                .map(|j| euclidean_distance(&data[i], &data[j])),
        );
        let (_, kth, _) = row.select_nth_unstable_by(k - 1, |a, b| a.total_cmp(b));
        core.push(*kth);
    }
    core
}

#[inline]
fn mutual_reachability(dist: f32, core_i: f32, core_j: f32) -> f32 {
    dist.max(core_i).max(core_j)
}

/// Compute an MST for a dense complete graph using Prim's algorithm.
///
/// `dist_fn(i, j)` returns the edge weight between points `i` and `j`.
/// Returns edges `(u, v, dist)`.
fn prim_mst(n: usize, dist_fn: impl Fn(usize, usize) -> f32) -> Vec<(usize, usize, f32)> {
    if n <= 1 {
        return Vec::new();
    }

    let mut in_tree = vec![false; n];
    let mut best = vec![f32::INFINITY; n];
    let mut parent = vec![usize::MAX; n];

    best[0] = 0.0;

    for _ in 0..n {
        let mut u = usize::MAX;
        let mut best_val = f32::INFINITY;
        for i in 0..n {
            if !in_tree[i] && best[i] < best_val {
                best_val = best[i];
                u = i;
            }
        }

        if u == usize::MAX {
            break;
        }
        in_tree[u] = true;

        for v in 0..n {
            if in_tree[v] {
                continue;
            }
            let d = dist_fn(u, v);
            if d < best[v] {
                best[v] = d;
                parent[v] = u;
            }
        }
    }

    let mut edges: Vec<(usize, usize, f32)> = Vec::with_capacity(n - 1);
    for v in 1..n {
        let u = parent[v];
        if u != usize::MAX {
            edges.push((u, v, best[v]));
        }
    }
    edges
}

/// Union-find that also keeps the member list of every root.
struct Components {
    parent: Vec<usize>,
    members: Vec<Vec<usize>>,
}

impl Components {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            members: (0..n).map(|i| vec![i]).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn size(&self, root: usize) -> usize {
        self.members[root].len()
    }

    /// Union by size; returns the surviving root.
    fn union_roots(&mut self, ra: usize, rb: usize) -> usize {
        if ra == rb {
            return ra;
        }
        let (big, small) = if self.size(ra) >= self.size(rb) { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        let moved = std::mem::take(&mut self.members[small]);
        self.members[big].extend(moved);
        big
    }
}

// ---------------------------------------------------------------------------
// Condensed cluster tree
// ---------------------------------------------------------------------------

/// A row of the condensed tree: a point falling out of a cluster
/// (`child` is a point index, `child_size == 1`) or a cluster splitting
/// into a child cluster (`child` is a cluster id, `child_size > 1`).
struct CondensedEdge {
    parent: usize,
    child: usize,
    lambda: f64,
    child_size: usize,
}

fn lambda_of(dist: f32) -> f64 {
    1.0 / f64::from(dist).max(MIN_DISTANCE)
}

fn fallouts(condensed: &mut Vec<CondensedEdge>, points: &[usize], cluster: usize, lambda: f64) {
    condensed.extend(points.iter().map(|&p| CondensedEdge {
        parent: cluster,
        child: p,
        lambda,
        child_size: 1,
    }));
}

/// Current cluster of a big component, creating one (with all members as
/// fallouts at `lambda`) when the component has none yet.
fn cluster_for(
    existing: Option<usize>,
    members: &[usize],
    lambda: f64,
    next_cluster_id: &mut usize,
    condensed: &mut Vec<CondensedEdge>,
) -> usize {
    match existing {
        Some(id) => id,
        None => {
            let id = *next_cluster_id;
            *next_cluster_id += 1;
            fallouts(condensed, members, id, lambda);
            id
        }
    }
}

fn extract_clusters(
    mst: &[(usize, usize, f32)],
    n: usize,
    min_cluster_size: usize,
    allow_single_cluster: bool,
) -> Vec<i32> {
    // Cluster ids start at n (point ids are 0..n-1).
    let mut next_cluster_id = n;
    let mut comps = Components::new(n);
    // component root -> current cluster id (None until the component is big enough)
    let mut comp_cluster: Vec<Option<usize>> = vec![None; n];
    let mut condensed: Vec<CondensedEdge> = Vec::new();

    for &(u, v, dist) in mst {
        let ru = comps.find(u);
        let rv = comps.find(v);
        if ru == rv {
            continue;
        }

        let lambda = lambda_of(dist);
        let ru_size = comps.size(ru);
        let rv_size = comps.size(rv);
        let left_big = ru_size >= min_cluster_size;
        let right_big = rv_size >= min_cluster_size;

        if left_big && right_big {
            // genuine split: both sides become children of a new parent
            let parent = next_cluster_id;
            next_cluster_id += 1;
            for (root, size) in [(ru, ru_size), (rv, rv_size)] {
                let child = cluster_for(
                    comp_cluster[root],
                    &comps.members[root],
                    lambda,
                    &mut next_cluster_id,
                    &mut condensed,
                );
                condensed.push(CondensedEdge {
                    parent,
                    child,
                    lambda,
                    child_size: size,
                });
            }

            let root = comps.union_roots(ru, rv);
            comp_cluster[root] = Some(parent);
        } else if left_big || right_big {
            let (big, small) = if left_big { (ru, rv) } else { (rv, ru) };

            let cluster = cluster_for(
                comp_cluster[big],
                &comps.members[big],
                lambda,
                &mut next_cluster_id,
                &mut condensed,
            );
            fallouts(&mut condensed, &comps.members[small], cluster, lambda);

            let root = comps.union_roots(big, small);
            comp_cluster[root] = Some(cluster);
        } else {
            // two small pieces: a cluster is born here if the union is big enough,
            // and top-down all of its points fall out at this lambda
            let root = comps.union_roots(ru, rv);
            comp_cluster[root] = if comps.size(root) >= min_cluster_size {
                Some(cluster_for(
                    None,
                    &comps.members[root],
                    lambda,
                    &mut next_cluster_id,
                    &mut condensed,
                ))
            } else {
                None
            };
        }
    }

    let num_clusters = next_cluster_id - n;
    if num_clusters == 0 {
        return vec![NOISE; n];
    }

    // Tree structure: children per cluster, parent per cluster, birth lambda.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); num_clusters];
    let mut has_parent = vec![false; num_clusters];
    let mut lambda_birth = vec![0.0f64; num_clusters];
    let mut by_parent: Vec<Vec<usize>> = vec![Vec::new(); num_clusters];
    for (e, edge) in condensed.iter().enumerate() {
        let p = edge.parent - n;
        by_parent[p].push(e);
        if edge.child_size > 1 && edge.child >= n {
            let c = edge.child - n;
            children[p].push(c);
            has_parent[c] = true;
            lambda_birth[c] = edge.lambda;
        }
    }

    // stability(c) = sum over rows with parent c of child_size * (lambda - birth(c))
    let mut stability = vec![0.0f64; num_clusters];
    for edge in &condensed {
        let c = edge.parent - n;
        stability[c] += edge.child_size as f64 * (edge.lambda - lambda_birth[c]);
    }

    // Post-order over the cluster forest, so descendants are settled before their parent.
    let mut post_order = Vec::with_capacity(num_clusters);
    for root in (0..num_clusters).filter(|&c| !has_parent[c]) {
        let mut stack = vec![(root, false)];
        while let Some((c, expanded)) = stack.pop() {
            if expanded {
                post_order.push(c);
            } else {
                stack.push((c, true));
                stack.extend(children[c].iter().map(|&ch| (ch, false)));
            }
        }
    }

    let mut selected = vec![false; num_clusters];
    let mut subtree_stab = vec![0.0f64; num_clusters];
    for &c in &post_order {
        let selectable = has_parent[c] || allow_single_cluster;
        if children[c].is_empty() {
            selected[c] = selectable;
            subtree_stab[c] = stability[c];
            continue;
        }
        let child_sum: f64 = children[c].iter().map(|&ch| subtree_stab[ch]).sum();
        if selectable && stability[c] > child_sum {
            selected[c] = true;
            deselect_descendants(&children, c, &mut selected);
            subtree_stab[c] = stability[c];
        } else {
            subtree_stab[c] = child_sum;
        }
    }

    let mut labels = vec![NOISE; n];
    let mut next_label = 0i32;
    for c in 0..num_clusters {
        if !selected[c] {
            continue;
        }
        label_all_points(&condensed, &by_parent, &selected, n, c, next_label, &mut labels);
        next_label += 1;
    }
    labels
}

/// Label the points of cluster `c` and of its non-selected descendants.
fn label_all_points(
    condensed: &[CondensedEdge],
    by_parent: &[Vec<usize>],
    selected: &[bool],
    n: usize,
    c: usize,
    label: i32,
    labels: &mut [i32],
) {
    for &e in &by_parent[c] {
        let edge = &condensed[e];
        if edge.child_size == 1 && edge.child < n {
            labels[edge.child] = label;
        } else if edge.child >= n {
            let child = edge.child - n;
            if !selected[child] {
                label_all_points(condensed, by_parent, selected, n, child, label, labels);
            }
        }
    }
}

fn deselect_descendants(children: &[Vec<usize>], node: usize, selected: &mut [bool]) {
    for &child in &children[node] {
        selected[child] = false;
        deselect_descendants(children, child, selected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn make_cluster(center: &[f32], n: usize, spread: f32) -> Vec<Vec<f32>> {
        let dim = center.len();
        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let mut p = Vec::with_capacity(dim);
            for (d, &c) in center.iter().enumerate() {
                let offset = spread * ((i * 7 + d * 13) % 11) as f32 / 11.0 - spread / 2.0;
                p.push(c + offset);
            }
            points.push(p);
        }
        points
    }

    #[test]
    fn test_two_well_separated_clusters() {
        let mut data = make_cluster(&[0.0, 0.0], 20, 0.5);
        data.extend(make_cluster(&[20.0, 20.0], 20, 0.5));

        let hdbscan = Hdbscan::new().with_min_samples(3).with_min_cluster_size(10);
        let labels = hdbscan.fit_predict(&data).unwrap();

        assert_eq!(labels.len(), 40);

        let l0 = labels[0];
        assert_ne!(l0, NOISE);
        for &l in &labels[1..20] {
            assert_eq!(l, l0);
        }

        let l20 = labels[20];
        assert_ne!(l20, NOISE);
        for &l in &labels[21..40] {
            assert_eq!(l, l20);
        }

        assert_ne!(l0, l20);
    }

    #[test]
    fn test_labels_are_dense_from_zero() {
        let mut data = make_cluster(&[0.0, 0.0], 15, 0.3);
        data.extend(make_cluster(&[20.0, 20.0], 15, 0.3));
        data.extend(make_cluster(&[-20.0, 20.0], 15, 0.3));

        let labels = Hdbscan::new().with_min_cluster_size(8).fit_predict(&data).unwrap();
        let ids: HashSet<i32> = labels.iter().copied().filter(|&l| l != NOISE).collect();
        let mut sorted: Vec<i32> = ids.into_iter().collect();
        sorted.sort();
        assert_eq!(sorted, (0..sorted.len() as i32).collect::<Vec<_>>());
        assert!(sorted.len() >= 3);
    }

    #[test]
    fn test_single_blob_needs_allow_single_cluster() {
        let data = make_cluster(&[0.0, 0.0], 20, 0.5);

        // root-only hierarchy: nothing selectable by default
        let labels = Hdbscan::new()
            .with_min_samples(3)
            .with_min_cluster_size(15)
            .fit_predict(&data)
            .unwrap();
        assert!(labels.iter().all(|&l| l == NOISE));

        let labels = Hdbscan::new()
            .with_min_samples(3)
            .with_min_cluster_size(15)
            .allow_single_cluster(true)
            .fit_predict(&data)
            .unwrap();
        let non_noise: Vec<i32> = labels.iter().copied().filter(|&l| l != NOISE).collect();
        assert!(!non_noise.is_empty());
        assert!(non_noise.iter().all(|&l| l == non_noise[0]));
    }

    #[test]
    fn test_all_noise_high_min_cluster_size() {
        let data = vec![vec![0.0, 0.0], vec![10.0, 10.0], vec![20.0, 20.0]];

        let labels = Hdbscan::new()
            .with_min_samples(2)
            .with_min_cluster_size(100)
            .fit_predict(&data)
            .unwrap();

        assert!(labels.iter().all(|&l| l == NOISE));
    }

    #[test]
    fn test_identical_points_do_not_produce_nan() {
        let mut data = vec![vec![1.0, 1.0]; 10];
        data.extend(vec![vec![9.0, 9.0]; 10]);

        let labels = Hdbscan::new().with_min_cluster_size(5).fit_predict(&data).unwrap();
        assert_eq!(labels.len(), 20);
        assert_ne!(labels[0], NOISE);
        assert_ne!(labels[10], NOISE);
        assert_ne!(labels[0], labels[10]);
    }

    #[test]
    fn test_empty_input() {
        let data: Vec<Vec<f32>> = vec![];
        assert!(matches!(Hdbscan::new().fit_predict(&data), Err(ClusterError::EmptyInput)));
    }

    #[test]
    fn test_invalid_parameters() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        assert!(Hdbscan::new().with_min_samples(0).fit_predict(&data).is_err());
        assert!(Hdbscan::new().with_min_cluster_size(1).fit_predict(&data).is_err());
    }

    #[test]
    fn test_dimension_mismatch_and_non_finite() {
        let ragged = vec![vec![0.0, 0.0], vec![1.0]];
        assert!(matches!(
            Hdbscan::new().fit_predict(&ragged),
            Err(ClusterError::DimensionMismatch { expected: 2, found: 1 })
        ));

        let nan = vec![vec![0.0, 0.0], vec![f32::NAN, 1.0]];
        assert!(matches!(Hdbscan::new().fit_predict(&nan), Err(ClusterError::NonFinite)));
    }

    #[test]
    fn test_large_min_samples_relative_to_data() {
        let data = make_cluster(&[0.0, 0.0], 10, 0.5);
        let labels = Hdbscan::new()
            .with_min_samples(100)
            .with_min_cluster_size(3)
            .fit_predict(&data)
            .unwrap();
        assert_eq!(labels.len(), 10);
    }

    #[test]
    fn test_single_point_is_noise() {
        let labels = Hdbscan::new().fit_predict(&[vec![0.5, 0.5]]).unwrap();
        assert_eq!(labels, vec![NOISE]);
    }

    fn line(start: f32, n: usize) -> Vec<Vec<f32>> {
        (0..n).map(|i| vec![start + 0.1 * i as f32, 0.0]).collect()
    }

    #[test]
    fn test_leaf_born_from_small_pieces_keeps_its_stability() {
        // A and B are dense and close to each other, C is far away. Each leaf
        // becomes big only when two small pieces merge; its stability runs
        // from that merge, so A and B outweigh their joint parent.
        let mut data = line(0.0, 5);
        data.extend(line(2.0, 5));
        data.extend(line(50.0, 10));

        let labels = Hdbscan::new()
            .with_min_samples(2)
            .with_min_cluster_size(5)
            .fit_predict(&data)
            .unwrap();

        let a = labels[0];
        let b = labels[5];
        let c = labels[10];
        assert!(labels[..5].iter().all(|&l| l == a));
        assert!(labels[5..10].iter().all(|&l| l == b));
        assert!(labels[10..].iter().all(|&l| l == c));
        assert!(a != NOISE && b != NOISE && c != NOISE);
        assert_ne!(a, b, "A and B were merged into their parent");
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_fit_predict_with_noise_api() {
        let mut data = make_cluster(&[0.0, 0.0], 15, 0.3);
        data.extend(make_cluster(&[10.0, 0.0], 15, 0.3));
        data.push(vec![100.0, 100.0]);

        let labels = Hdbscan::new()
            .with_min_samples(3)
            .with_min_cluster_size(5)
            .fit_predict_with_noise(&data)
            .unwrap();

        assert_eq!(labels.len(), 31);
        assert!(labels[..15].iter().any(|l| l.is_some()));
    }

    #[test]
    fn test_non_noise_labels_meet_min_cluster_size() {
        let mut data = make_cluster(&[0.0, 0.0], 25, 0.5);
        data.extend(make_cluster(&[30.0, 30.0], 25, 0.5));
        data.push(vec![15.0, 15.0]);

        let min_cluster_size = 5;
        let labels = Hdbscan::new()
            .with_min_samples(3)
            .with_min_cluster_size(min_cluster_size)
            .fit_predict(&data)
            .unwrap();

        let mut counts = HashMap::new();
        for &l in &labels {
            if l != NOISE {
                *counts.entry(l).or_insert(0usize) += 1;
            }
        }

        for (&label, &count) in &counts {
            assert!(
                count >= min_cluster_size,
                "label {label} has {count} points, expected at least {min_cluster_size}"
            );
        }
    }
}
