//! OpenAI embedding provider.
//!
//! Calls the OpenAI embeddings API (`/v1/embeddings`) with retry logic
//! (max 3 attempts, exponential backoff).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, sleep};

use super::config::EmbeddingConfig;
use super::{Embedder, EmbeddingError, check_dimensions};

const MAX_RETRY_ATTEMPTS: u32 = 3;

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f64>,
}

/// Embedder backed by the OpenAI API.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            EmbeddingError::Config("OPENAI_API_KEY is required for openai provider".to_string())
        })?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/v1/embeddings", config.openai_base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    async fn attempt(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&OpenAiRequest {
                model: &self.model,
                input: text,
                dimensions: self.dimensions,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Provider(format!("OpenAI request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(EmbeddingError::Provider(format!(
                "OpenAI embeddings failed: {status} {body}"
            )));
        }

        let data: OpenAiResponse = resp
            .json()
            .await
            .map_err(|e| EmbeddingError::Provider(format!("OpenAI response parse error: {e}")))?;

        let embedding = data
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Provider("OpenAI returned empty data array".into()))?
            .embedding
            .into_iter()
            .map(|v| v as f32)
            .collect();
        check_dimensions(embedding, self.dimensions)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            match self.attempt(text).await {
                Ok(embedding) => return Ok(embedding),
                // A wrong-sized vector will not fix itself on retry.
                Err(e @ EmbeddingError::DimensionMismatch { .. }) => return Err(e),
                Err(e) => last_error = Some(e),
            }

            if attempt + 1 < MAX_RETRY_ATTEMPTS {
                sleep(Duration::from_secs(2u64.pow(attempt + 1))).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EmbeddingError::Provider(format!(
                "Failed to embed after {MAX_RETRY_ATTEMPTS} attempts"
            ))
        }))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn sends_bearer_key_and_parses_first_embedding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "embedding": [0.25, 0.75] }]
            })))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new(&EmbeddingConfig {
            provider: "openai".into(),
            dimensions: 2,
            openai_base_url: server.uri(),
            openai_api_key: Some("sk-test".into()),
            ..EmbeddingConfig::default()
        })
        .unwrap();

        assert_eq!(embedder.embed("hi").await.unwrap(), vec![0.25, 0.75]);
    }
}
