//! Retrieval/ingestion gateway over an embedding provider and a vector store.
//!
//! - [`RetrievalGateway::ingest`]: chunk, embed and append text
//! - [`RetrievalGateway::retrieve`]: embed a query and return the top-K hits
//! - [`RetrievalGateway::reindex`]: rebuild and replace the search index

pub mod chunk;
pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::embedding::{Embedder, EmbeddingError};

/// Source tag used when the caller does not name one.
pub const DEFAULT_SOURCE: &str = "unknown";

/// Errors raised by vector store implementations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors raised by the gateway.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector store failed: {0}")]
    Store(#[from] VectorStoreError),

    #[error("{0} timed out after {1:?}")]
    Timeout(&'static str, Duration),

    #[error("Nothing to ingest")]
    EmptyText,
}

/// One stored embedding with its source text and metadata blob.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub vector: Vec<f32>,
    pub text: String,
    /// JSON metadata; always carries a `source` string.
    pub meta: Value,
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub meta: Value,
}

impl SearchHit {
    /// The ingestion origin recorded in the metadata.
    pub fn source(&self) -> &str {
        self.meta
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SOURCE)
    }

    /// `"<text>\n\t- <source>"`.
    pub fn display(&self) -> String {
        format!("{}\n\t- {}", self.text, self.source())
    }
}

/// k-nearest-neighbour storage of embedding records. Append-only.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn insert(&self, record: EmbeddingRecord) -> Result<(), VectorStoreError>;

    /// Up to `limit` records, most similar first.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>, VectorStoreError>;

    /// Rebuild the search index, replacing any existing one.
    async fn rebuild_index(&self) -> Result<(), VectorStoreError>;
}

/// Gateway settings.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub chunk_size: usize,
    /// Bound on each embedding and store call.
    pub call_timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            chunk_size: chunk::DEFAULT_CHUNK_SIZE,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Embed-and-insert, embed-and-search and index rebuild.
#[derive(Clone)]
pub struct RetrievalGateway {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
}

impl RetrievalGateway {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    pub fn config(&self) -> RetrievalConfig {
        self.config
    }

    async fn bounded<T, E>(
        &self,
        what: &'static str,
        fut: impl Future<Output = Result<T, E>>,
    ) -> Result<T, RetrievalError>
    where
        RetrievalError: From<E>,
    {
        match timeout(self.config.call_timeout, fut).await {
            Ok(result) => result.map_err(RetrievalError::from),
            Err(_) => Err(RetrievalError::Timeout(what, self.config.call_timeout)),
        }
    }

    /// Chunk `text`, embed each chunk and append it with `{"source": source}`.
    ///
    /// Returns the number of records inserted.
    pub async fn ingest(&self, text: &str, source: Option<&str>) -> Result<usize, RetrievalError> {
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SOURCE);
        let chunks = chunk::split_text(text, self.config.chunk_size);
        if chunks.is_empty() {
            return Err(RetrievalError::EmptyText);
        }

        let count = chunks.len();
        for chunk in chunks {
            let vector = self.bounded("embedding", self.embedder.embed(&chunk)).await?;
            let record = EmbeddingRecord {
                vector,
                text: chunk,
                meta: json!({ "source": source }),
            };
            self.bounded("vector insert", self.store.insert(record)).await?;
        }
        info!(source, chunks = count, "ingested text");
        Ok(count)
    }

    /// Embed `query` and return up to top-K hits, most similar first.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, RetrievalError> {
        let vector = self.bounded("embedding", self.embedder.embed(query)).await?;
        let hits = self
            .bounded("vector search", self.store.search(&vector, self.config.top_k))
            .await?;
        debug!(hits = hits.len(), "vector search complete");
        Ok(hits)
    }

    /// Like [`Self::search`], formatted as `"<text>\n\t- <source>"`.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<String>, RetrievalError> {
        Ok(self.search(query).await?.iter().map(SearchHit::display).collect())
    }

    /// Full, replacing rebuild of the vector index.
    pub async fn reindex(&self) -> Result<(), RetrievalError> {
        self.bounded("index rebuild", self.store.rebuild_index()).await?;
        info!("vector index rebuilt");
        Ok(())
    }
}
