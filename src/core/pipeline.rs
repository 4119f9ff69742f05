// Encoder -> Reducer -> Clusterer orchestration

use crate::core::clustering::{ClusterError, cluster_count, cluster_embeddings, noise_count};
use crate::core::embeddings::{EmbeddingError, EmbeddingService, TextEncoder};
use crate::core::reduction::{ProjectionSource, ReduceError, ReductionConfig, reduce_dimensionality};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::info;

/// Errors from any stage of the cluster pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Empty input: no texts provided")]
    EmptyInput,

    #[error("Encoding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Dimensionality reduction failed: {0}")]
    Reduction(#[from] ReduceError),

    #[error("Clustering failed: {0}")]
    Clustering(#[from] ClusterError),
}

/// Parameters of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Output dimensionality of the projection
    pub n_components: usize,
    /// Requested minimum cluster size, clamped to `[2, N]` before clustering
    pub min_cluster_size: usize,
    /// Seed for the projector
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            n_components: 2,
            min_cluster_size: 15,
            seed: 42,
        }
    }
}

impl PipelineConfig {
    pub fn with_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn reduction(&self) -> ReductionConfig {
        ReductionConfig::new(self.n_components).with_seed(self.seed)
    }
}

/// Coordinates and labels of one run, row `i` of each belonging to text `i`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub coordinates: Vec<Vec<f32>>,
    pub labels: Vec<i32>,
    /// Which projector produced `coordinates`
    pub projection: ProjectionSource,
}

impl PipelineOutput {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Embed, project and cluster `texts` in a single pass.
///
/// `encoder` is borrowed read-only; when `None` the default fastembed model
/// is loaded for this call. Errors from any stage are returned as is, only
/// the reducer recovers internally (UMAP to PCA).
pub fn pipeline_cluster(
    texts: &[String],
    encoder: Option<&dyn TextEncoder>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    if texts.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let owned;
    let encoder: &dyn TextEncoder = match encoder {
        Some(encoder) => encoder,
        None => {
            owned = EmbeddingService::default();
            &owned
        }
    };

    let start = Instant::now();
    let embeddings = encoder.encode(texts)?;
    info!(
        count = embeddings.len(),
        model = encoder.model_name(),
        dimension = encoder.dimension(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "encoded texts"
    );

    let start = Instant::now();
    let reduction = reduce_dimensionality(&embeddings, &config.reduction())?;
    info!(
        method = %reduction.method,
        fallback = reduction.used_fallback(),
        components = config.n_components,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "projected embeddings"
    );

    let start = Instant::now();
    let labels = cluster_embeddings(&reduction.coordinates, config.min_cluster_size)?;
    info!(
        clusters = cluster_count(&labels),
        noise = noise_count(&labels),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "clustered coordinates"
    );

    Ok(PipelineOutput {
        coordinates: reduction.coordinates,
        labels,
        projection: reduction.source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes a text as its character-class histogram, enough to make rows distinct
    struct CountingEncoder;

    impl TextEncoder for CountingEncoder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 4];
                    for c in t.chars() {
                        let slot = match c {
                            'a' | 'e' | 'i' | 'o' | 'u' => 0,
                            ' ' => 1,
                            c if c.is_ascii_digit() => 2,
                            _ => 3,
                        };
                        v[slot] += 1.0;
                    }
                    v
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    struct BrokenEncoder;

    impl TextEncoder for BrokenEncoder {
        fn encode(&self, _: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::ModelInitError("no weights".to_string()))
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.n_components, 2);
        assert_eq!(config.min_cluster_size, 15);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_empty_texts_rejected() {
        let result = pipeline_cluster(&[], Some(&CountingEncoder), &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn test_single_text() {
        let texts = vec!["only one review".to_string()];
        let output = pipeline_cluster(&texts, Some(&CountingEncoder), &PipelineConfig::default()).unwrap();
        assert_eq!(output.labels, vec![0]);
        assert_eq!(output.coordinates.len(), 1);
        assert_eq!(output.coordinates[0].len(), 2);
        assert!(matches!(output.projection, ProjectionSource::Fallback { .. }));
    }

    #[test]
    fn test_encoder_error_propagates() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let result = pipeline_cluster(&texts, Some(&BrokenEncoder), &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::Embedding(_))));
    }

    #[test]
    fn test_reducer_error_propagates() {
        // identical rows send UMAP to PCA, and 5 components exceed PCA's 4 input dimensions
        let texts = vec!["same".to_string(); 6];
        let config = PipelineConfig::default().with_components(5);
        let result = pipeline_cluster(&texts, Some(&CountingEncoder), &config);
        assert!(matches!(result, Err(PipelineError::Reduction(_))));
    }

    #[test]
    fn test_output_rows_match_input() {
        let texts: Vec<String> = (0..12).map(|i| format!("review {} {}", i, "x".repeat(i))).collect();
        let config = PipelineConfig::default().with_min_cluster_size(3);
        let output = pipeline_cluster(&texts, Some(&CountingEncoder), &config).unwrap();
        assert_eq!(output.len(), 12);
        assert_eq!(output.coordinates.len(), 12);
        assert!(output.coordinates.iter().all(|c| c.len() == 2));
    }
}
