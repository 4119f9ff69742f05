// Encoder model selection

use fastembed::EmbeddingModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentence encoders the pipeline can load through fastembed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    AllMiniLmL6V2,
    AllMiniLmL12V2,
    AllMpnetBaseV2,
    BgeSmallEnV15,
    BgeBaseEnV15,
    MultilingualE5Small,
}

impl ModelType {
    /// Convert to fastembed's EmbeddingModel enum
    pub fn to_fastembed(&self) -> EmbeddingModel {
        match self {
            ModelType::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
            ModelType::AllMiniLmL12V2 => EmbeddingModel::AllMiniLML12V2,
            ModelType::AllMpnetBaseV2 => EmbeddingModel::AllMpnetBaseV2,
            ModelType::BgeSmallEnV15 => EmbeddingModel::BGESmallENV15,
            ModelType::BgeBaseEnV15 => EmbeddingModel::BGEBaseENV15,
            ModelType::MultilingualE5Small => EmbeddingModel::MultilingualE5Small,
        }
    }

    /// Embedding dimension produced by this model
    pub fn dimension(&self) -> usize {
        match self {
            ModelType::AllMiniLmL6V2
            | ModelType::AllMiniLmL12V2
            | ModelType::BgeSmallEnV15
            | ModelType::MultilingualE5Small => 384,
            ModelType::AllMpnetBaseV2 | ModelType::BgeBaseEnV15 => 768,
        }
    }

    /// Canonical identifier, also accepted by `FromStr`
    pub fn id(&self) -> &'static str {
        match self {
            ModelType::AllMiniLmL6V2 => "all-MiniLM-L6-v2",
            ModelType::AllMiniLmL12V2 => "all-MiniLM-L12-v2",
            ModelType::AllMpnetBaseV2 => "all-mpnet-base-v2",
            ModelType::BgeSmallEnV15 => "bge-small-en-v1.5",
            ModelType::BgeBaseEnV15 => "bge-base-en-v1.5",
            ModelType::MultilingualE5Small => "multilingual-e5-small",
        }
    }

    pub fn language(&self) -> &'static str {
        match self {
            ModelType::MultilingualE5Small => "Multilingual",
            _ => "English",
        }
    }

    pub fn all() -> &'static [ModelType] {
        &[
            ModelType::AllMiniLmL6V2,
            ModelType::AllMiniLmL12V2,
            ModelType::AllMpnetBaseV2,
            ModelType::BgeSmallEnV15,
            ModelType::BgeBaseEnV15,
            ModelType::MultilingualE5Small,
        ]
    }
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::AllMiniLmL6V2
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelType {
    type Err = String;

    /// Case-insensitive, accepts an optional `org/` prefix and a few short aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let name = lower.rsplit('/').next().unwrap_or(lower.as_str());
        match name {
            "all-minilm-l6-v2" | "minilm" | "minilm-l6" => Ok(ModelType::AllMiniLmL6V2),
            "all-minilm-l12-v2" | "minilm-l12" => Ok(ModelType::AllMiniLmL12V2),
            "all-mpnet-base-v2" | "all-mpnet" | "mpnet" => Ok(ModelType::AllMpnetBaseV2),
            "bge-small-en-v1.5" | "bge-small" => Ok(ModelType::BgeSmallEnV15),
            "bge-base-en-v1.5" | "bge-base" => Ok(ModelType::BgeBaseEnV15),
            "multilingual-e5-small" | "e5-small" => Ok(ModelType::MultilingualE5Small),
            _ => {
                let known: Vec<&str> = ModelType::all().iter().map(|m| m.id()).collect();
                Err(format!("unknown model '{}', expected one of: {}", s, known.join(", ")))
            }
        }
    }
}

/// Detailed model information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: ModelType,
    pub id: String,
    pub dimension: usize,
    pub language: String,
}

impl From<ModelType> for ModelInfo {
    fn from(model_type: ModelType) -> Self {
        ModelInfo {
            model_type,
            id: model_type.id().to_string(),
            dimension: model_type.dimension(),
            language: model_type.language().to_string(),
        }
    }
}
