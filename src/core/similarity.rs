// Distance helpers and matrix validation shared by the reducers and the clusterer

use serde::{Deserialize, Serialize};

#[inline]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Compute Euclidean distance between two vectors
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    squared_euclidean(a, b).sqrt()
}

/// Mean of each column. Empty input gives an empty vector.
pub fn centroid(rows: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let mut mean = vec![0.0f64; first.len()];
    for row in rows {
        for (m, &v) in mean.iter_mut().zip(row.iter()) {
            *m += f64::from(v);
        }
    }
    let n = rows.len() as f64;
    mean.into_iter().map(|m| (m / n) as f32).collect()
}

/// True when every row equals the first one (no spread at all)
pub fn all_rows_identical(rows: &[Vec<f32>]) -> bool {
    match rows.split_first() {
        Some((first, rest)) => rest.iter().all(|r| r == first),
        None => true,
    }
}

/// Result of checking a matrix for shape and finiteness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub count: usize,
    pub dimension: Option<usize>,
    pub issues: Vec<String>,
}

/// Validate that all rows share one dimension and hold only finite values
pub fn validate_embeddings(
    embeddings: &[Vec<f32>],
    expected_dim: Option<usize>,
) -> ValidationResult {
    if embeddings.is_empty() {
        return ValidationResult {
            valid: false,
            count: 0,
            dimension: None,
            issues: vec!["No embeddings found".to_string()],
        };
    }

    let mut issues = Vec::new();
    let dimension = embeddings[0].len();
    let expected = expected_dim.unwrap_or(dimension);

    for (i, emb) in embeddings.iter().enumerate() {
        if emb.len() != expected {
            issues.push(format!(
                "Embedding {} has dimension {} (expected {})",
                i,
                emb.len(),
                expected
            ));
        }

        // one report per row is enough
        if let Some(j) = emb.iter().position(|v| !v.is_finite()) {
            issues.push(format!("Embedding {}[{}] is not finite", i, j));
        }
    }

    ValidationResult {
        valid: issues.is_empty(),
        count: embeddings.len(),
        dimension: Some(dimension),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance() {
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);
        assert_eq!(squared_euclidean(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_centroid() {
        let rows = vec![vec![0.0, 2.0], vec![2.0, 4.0]];
        assert_eq!(centroid(&rows), vec![1.0, 3.0]);
        assert!(centroid(&[]).is_empty());
    }

    #[test]
    fn test_all_rows_identical() {
        assert!(all_rows_identical(&[vec![1.0, 2.0], vec![1.0, 2.0]]));
        assert!(!all_rows_identical(&[vec![1.0, 2.0], vec![1.0, 2.5]]));
        assert!(all_rows_identical(&[vec![3.0]]));
    }

    #[test]
    fn test_validation() {
        let embeddings = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let result = validate_embeddings(&embeddings, None);
        assert!(result.valid);
        assert_eq!(result.count, 2);
        assert_eq!(result.dimension, Some(3));
    }

    #[test]
    fn test_validation_dimension_mismatch() {
        let embeddings = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0]];
        let result = validate_embeddings(&embeddings, None);
        assert!(!result.valid);
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn test_validation_non_finite() {
        let embeddings = vec![vec![1.0, f32::NAN, f32::INFINITY]];
        let result = validate_embeddings(&embeddings, Some(3));
        assert!(!result.valid);
        assert_eq!(result.issues.len(), 1);
    }
}
