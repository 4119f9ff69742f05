// Review Insights Library
// Cleans, scores, embeds, projects and density-clusters product reviews

pub mod core;

// Re-export core functionality for external use
pub use core::{
    // Model types
    ModelType, ModelInfo,
    // Encoder
    EmbeddingService, EmbeddingError, TextEncoder,
    // Distance helpers
    euclidean_distance, validate_embeddings, ValidationResult,
    // Dimensionality reduction
    reduce_dimensionality, reduce_with, neighbors_for,
    Projector, Umap, Pca, Reduction, ReductionConfig,
    ProjectionMethod, ProjectionSource, ReduceError,
    // Clustering
    Hdbscan, NOISE,
    cluster_embeddings, derive_effective_cluster_size,
    cluster_sizes, cluster_members, cluster_count, noise_count,
    ClusterError,
    // Pipeline
    pipeline_cluster, PipelineConfig, PipelineOutput, PipelineError,
    // Data loading and export
    load_reviews, sample_records, write_annotated, ReviewRecord, DataError,
    // Preprocessing
    clean_corpus, TextCleaner, StopWords, Lemmatizer,
    // Sentiment
    analyze_sentiment, label_sentiment, SentimentAnalyzer, SentimentLabel, SentimentScores,
    // Types
    AnnotatedReview, ClusterInfo, ClusterMember, ClusterSummary, SentimentSummary,
};
