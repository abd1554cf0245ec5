//! Embedding module: text → fixed-size vector.
//!
//! # Providers
//!
//! - `"local"`: deterministic FNV-1a hash (offline, no external deps)
//! - `"ollama"`: Ollama local API (`nomic-embed-text`)
//! - `"openai"`: OpenAI API (`text-embedding-3-small`)

pub mod config;
pub mod local;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use config::EmbeddingConfig;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// An embedding provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text. The result always has [`Embedder::dimensions`] entries.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimensions(&self) -> usize;
}

/// Build the embedder selected by `config.provider`.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.provider.as_str() {
        "local" => Ok(Arc::new(local::LocalEmbedder::new(config.dimensions))),
        "ollama" => Ok(Arc::new(ollama::OllamaEmbedder::new(config)?)),
        "openai" => Ok(Arc::new(openai::OpenAiEmbedder::new(config)?)),
        other => Err(EmbeddingError::UnsupportedProvider(other.to_string())),
    }
}

/// Reject vectors whose length differs from the configured dimensionality.
pub(crate) fn check_dimensions(
    embedding: Vec<f32>,
    expected: usize,
) -> Result<Vec<f32>, EmbeddingError> {
    if embedding.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(embedding)
}
