// Pipeline stages shared by the library API and the CLI

pub mod model;
pub mod embeddings;
pub mod similarity;
pub mod reduction;
pub mod hdbscan;
pub mod clustering;
pub mod pipeline;
pub mod data;
pub mod preprocessing;
pub mod sentiment;
pub mod types;

// Re-export model types
pub use model::{ModelType, ModelInfo};

// Re-export the encoder
pub use embeddings::{EmbeddingService, EmbeddingError, TextEncoder};

// Re-export distance helpers
pub use similarity::{
    euclidean_distance, squared_euclidean,
    centroid, all_rows_identical, validate_embeddings, ValidationResult,
};

// Re-export dimensionality reduction
pub use reduction::{
    reduce_dimensionality, reduce_with, neighbors_for,
    Projector, Umap, Pca, Reduction, ReductionConfig,
    ProjectionMethod, ProjectionSource, ReduceError, DEFAULT_N_NEIGHBORS,
};

// Re-export clustering
pub use hdbscan::{Hdbscan, NOISE};
pub use clustering::{
    cluster_embeddings, derive_effective_cluster_size,
    cluster_sizes, cluster_members, cluster_count, noise_count,
    ClusterError,
};

// Re-export the orchestrator
pub use pipeline::{pipeline_cluster, PipelineConfig, PipelineOutput, PipelineError};

// Re-export driver stages
pub use data::{load_reviews, sample_records, write_annotated, ReviewRecord, DataError, REQUIRED_COLUMNS};
pub use preprocessing::{clean_corpus, Lemmatizer, StopWords, TextCleaner, DEFAULT_BATCH_SIZE};
pub use sentiment::{
    analyze_sentiment, label_sentiment,
    SentimentAnalyzer, SentimentLabel, SentimentScores,
};

// Re-export common types
pub use types::{
    AnnotatedReview, ClusterInfo, ClusterMember, ClusterSummary, SentimentSummary,
};
