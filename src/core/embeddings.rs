// Sentence embedding service backed by fastembed

use crate::core::model::ModelType;
use crate::core::similarity::validate_embeddings;
use fastembed::{InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during embedding operations
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize model: {0}")]
    ModelInitError(String),

    #[error("Failed to generate embeddings: {0}")]
    EmbeddingFailed(String),

    #[error("Model lock error: {0}")]
    LockError(String),

    #[error("Empty input: no texts provided")]
    EmptyInput,
}

/// Anything that turns an ordered batch of texts into one vector per text.
///
/// Implementations must return rows in input order, all of length
/// [`TextEncoder::dimension`]. `encode` takes `&self` so one handle can be
/// shared read-only across pipeline runs.
pub trait TextEncoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// fastembed-backed encoder. The model is loaded on first use and then reused.
pub struct EmbeddingService {
    model_type: ModelType,
    model: Mutex<Option<TextEmbedding>>,
    show_progress: bool,
    batch_size: Option<usize>,
    cache_dir: Option<PathBuf>,
}

impl EmbeddingService {
    pub fn new(model_type: ModelType) -> Self {
        EmbeddingService {
            model_type,
            model: Mutex::new(None),
            show_progress: false,
            batch_size: None,
            cache_dir: None,
        }
    }

    /// Show model download progress
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Texts per inference batch (fastembed picks its own default when unset)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Where downloaded model files are stored
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    fn load(&self) -> Result<TextEmbedding, EmbeddingError> {
        info!(model = %self.model_type, "loading embedding model");
        let mut options = InitOptions::new(self.model_type.to_fastembed())
            .with_show_download_progress(self.show_progress);
        if let Some(dir) = &self.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }
        TextEmbedding::try_new(options).map_err(|e| EmbeddingError::ModelInitError(e.to_string()))
    }

    /// Load the model now instead of on the first `encode`
    pub fn preload(&self) -> Result<(), EmbeddingError> {
        let mut slot = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::LockError(e.to_string()))?;
        if slot.is_none() {
            *slot = Some(self.load()?);
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.model
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

impl Default for EmbeddingService {
    fn default() -> Self {
        Self::new(ModelType::default())
    }
}

impl TextEncoder for EmbeddingService {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut slot = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::LockError(e.to_string()))?;
        if slot.is_none() {
            *slot = Some(self.load()?);
        }
        let model = slot
            .as_mut()
            .ok_or_else(|| EmbeddingError::ModelInitError("model not loaded".to_string()))?;

        debug!(count = texts.len(), "encoding texts");
        let embeddings = model
            .embed(texts, self.batch_size)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        let report = validate_embeddings(&embeddings, Some(self.dimension()));
        if embeddings.len() != texts.len() || !report.valid {
            return Err(EmbeddingError::EmbeddingFailed(format!(
                "expected {} rows of dimension {}, got {} rows ({})",
                texts.len(),
                self.dimension(),
                embeddings.len(),
                report.issues.join("; ")
            )));
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.model_type.dimension()
    }

    fn model_name(&self) -> &str {
        self.model_type.id()
    }
}
