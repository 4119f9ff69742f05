// CLI driver for the review insights pipeline
// load -> preprocess -> sentiment -> cluster -> write annotated sample

use clap::{Parser, ValueEnum};
use review_insights::{
    analyze_sentiment, clean_corpus, label_sentiment, load_reviews, pipeline_cluster, sample_records,
    write_annotated, AnnotatedReview, ClusterSummary, EmbeddingService, ModelInfo, ModelType,
    PipelineConfig, SentimentSummary,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Load the CSV and print the first rows
    Load,
    /// Clean the review text and print text/cleaned pairs
    Preprocess,
    /// Score a sample and print label counts
    Sentiment,
    /// Embed, project and cluster the sample and print the cluster distribution
    Cluster,
    /// Run every stage and write the annotated sample
    Full,
}

#[derive(Parser)]
#[command(name = "review-insights")]
#[command(version = "0.1.0")]
#[command(about = "Review insights pipeline: load -> preprocess -> sentiment -> cluster", long_about = None)]
struct Cli {
    /// Path to Reviews.csv
    #[arg(long, default_value = "data/raw/Reviews.csv")]
    path: PathBuf,

    /// Number of rows to read (for quick tests)
    #[arg(long)]
    nrows: Option<usize>,

    /// Which stage to stop after
    #[arg(long, value_enum, default_value = "full")]
    mode: Mode,

    /// Sample size for sentiment and clustering
    #[arg(long, default_value = "10000")]
    sample: usize,

    /// Requested minimum cluster size, clamped to the sample size
    #[arg(long, default_value = "15")]
    min_cluster_size: usize,

    /// Output dimensionality of the projection
    #[arg(long, default_value = "2")]
    components: usize,

    /// Seed for sampling and projection
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Embedding model (see --list-models)
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "all-MiniLM-L6-v2")]
    model: String,

    /// Texts per cleaning batch
    #[arg(long, default_value = "500")]
    batch_size: usize,

    /// Where the annotated sample is written in full mode
    #[arg(short, long, default_value = "output_sample.csv")]
    output: PathBuf,

    /// Texts per embedding batch (fastembed's default when unset)
    #[arg(long)]
    embed_batch_size: Option<usize>,

    /// Directory for downloaded model files
    #[arg(long, env = "FASTEMBED_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Show model download progress
    #[arg(long)]
    progress: bool,

    /// Print the supported embedding models as JSON and exit
    #[arg(long)]
    list_models: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_models {
        let models: Vec<ModelInfo> = ModelType::all().iter().map(|&m| ModelInfo::from(m)).collect();
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }
    let model_type: ModelType = cli.model.parse()?;

    // 1) Load
    let records = load_reviews(&cli.path, cli.nrows)?;
    if cli.mode == Mode::Load {
        println!("{:>5}  {:>5}  {:<25}  {:<40}  Time", "", "Score", "Summary", "Text");
        for (i, r) in records.iter().take(5).enumerate() {
            println!(
                "{:>5}  {:>5}  {:<25}  {:<40}  {}",
                i,
                r.score,
                truncate(&r.summary, 25),
                truncate(&r.text, 40),
                r.time.format("%Y-%m-%d")
            );
        }
        println!("[{} rows]", records.len());
        return Ok(());
    }

    // 2) Preprocess
    let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
    let cleaned = clean_corpus(&texts, cli.batch_size);
    if cli.mode == Mode::Preprocess {
        for (i, (text, clean)) in texts.iter().zip(cleaned.iter()).take(5).enumerate() {
            println!("{:>3}  {:<50}  {}", i, truncate(text, 50), truncate(clean, 50));
        }
        return Ok(());
    }

    // 3) Sentiment on a seeded sample
    let rows: Vec<(usize, &str)> = cleaned.iter().map(|c| c.as_str()).enumerate().collect();
    let sample = sample_records(&rows, cli.sample, cli.seed);
    let sample_texts: Vec<String> = sample.iter().map(|(_, c)| c.to_string()).collect();

    let scores = analyze_sentiment(&sample_texts);
    let labels = label_sentiment(&scores, 0.0);
    if cli.mode == Mode::Sentiment {
        let summary = SentimentSummary::from_labels(&labels);
        println!("vader_label");
        println!("positive    {}", summary.positive);
        println!("negative    {}", summary.negative);
        return Ok(());
    }

    // 4) Clustering
    let mut encoder = EmbeddingService::new(model_type).with_progress(cli.progress);
    if let Some(batch_size) = cli.embed_batch_size {
        encoder = encoder.with_batch_size(batch_size);
    }
    if let Some(dir) = &cli.cache_dir {
        encoder = encoder.with_cache_dir(dir.clone());
    }
    let config = PipelineConfig::default()
        .with_components(cli.components)
        .with_min_cluster_size(cli.min_cluster_size)
        .with_seed(cli.seed);
    let output = pipeline_cluster(&sample_texts, Some(&encoder), &config)?;

    if cli.mode == Mode::Cluster {
        let summary = ClusterSummary::from_labels(&sample_texts, &output.labels).with_projection(output.projection);
        println!("Clusters distribution:");
        println!("cluster");
        for (label, count) in summary.distribution() {
            println!("{:>7}    {}", label, count);
        }
        return Ok(());
    }

    // 5) Full pipeline: save the sample with all annotations
    let annotated: Vec<AnnotatedReview> = sample
        .iter()
        .zip(scores.iter().zip(labels.iter()))
        .zip(output.labels.iter().zip(output.coordinates.into_iter()))
        .map(|(((idx, clean), (&score, &label)), (&cluster, coords))| {
            AnnotatedReview::new(records[*idx].clone(), clean.to_string(), score, label)
                .with_cluster(cluster, coords)
        })
        .collect();
    write_annotated(&cli.output, &annotated)?;
    println!("Full pipeline done, sample saved to {}", cli.output.display());
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
