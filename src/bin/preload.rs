// Download and warm an embedding model, e.g. during a container build

use review_insights::{EmbeddingService, ModelType, TextEncoder};
use std::env;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let model_type = match args.get(1) {
        Some(name) => name.parse::<ModelType>()?,
        None => ModelType::default(),
    };

    println!("======================================");
    println!("Using embedding model: {}", model_type);
    let service = EmbeddingService::new(model_type).with_progress(true);
    service.preload()?;

    let embeddings = service.encode(&["test".to_string()])?;
    println!("Embedding dimension = {}", embeddings[0].len());
    println!("Done");
    Ok(())
}
