//! Embedding configuration resolved from environment variables.

use std::env;
use std::time::Duration;

/// Which embedding provider/model to use.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Provider name: `"local"`, `"ollama"`, or `"openai"`.
    pub provider: String,
    /// Model name passed to the provider.
    pub model: String,
    /// Output dimensionality; must match the vector store column.
    pub dimensions: usize,
    /// Ollama API base URL.
    pub ollama_base_url: String,
    /// OpenAI API base URL.
    pub openai_base_url: String,
    /// OpenAI API key (required when provider is `"openai"`).
    pub openai_api_key: Option<String>,
    /// Bound on each provider request.
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            ollama_base_url: "http://localhost:11434".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            openai_api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl EmbeddingConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable               | Default                  |
    /// |------------------------|--------------------------|
    /// | `EMBEDDING_PROVIDER`   | `local`                  |
    /// | `EMBEDDING_MODEL`      | `nomic-embed-text`       |
    /// | `EMBEDDING_DIMENSIONS` | `768`                    |
    /// | `OLLAMA_BASE_URL`      | `http://localhost:11434` |
    /// | `OPENAI_BASE_URL`      | `https://api.openai.com` |
    /// | `OPENAI_API_KEY`       | unset                    |
    pub fn from_env(timeout: Duration) -> Self {
        let defaults = Self::default();
        Self {
            provider: env::var("EMBEDDING_PROVIDER").unwrap_or(defaults.provider),
            model: env::var("EMBEDDING_MODEL").unwrap_or(defaults.model),
            dimensions: env::var("EMBEDDING_DIMENSIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.dimensions),
            ollama_base_url: env::var("OLLAMA_BASE_URL").unwrap_or(defaults.ollama_base_url),
            openai_base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout,
        }
    }
}
