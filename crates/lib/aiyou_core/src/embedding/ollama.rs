//! Ollama embedding provider.
//!
//! Calls the Ollama API (`/api/embeddings`), one prompt per request.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::config::EmbeddingConfig;
use super::{Embedder, EmbeddingError, check_dimensions};

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    embedding: Option<Vec<f64>>,
}

/// Embedder backed by a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/api/embeddings", config.ollama_base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&OllamaRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Provider(format!("Ollama request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(EmbeddingError::Provider(format!(
                "Ollama embeddings failed: {status} {body}"
            )));
        }

        let data: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| EmbeddingError::Provider(format!("Ollama response parse error: {e}")))?;

        let embedding = data
            .embedding
            .unwrap_or_default()
            .into_iter()
            .map(|v| v as f32)
            .collect();
        check_dimensions(embedding, self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
