//! PostgreSQL + pgvector vector store over the `embeddings` table.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use super::{EmbeddingRecord, SearchHit, VectorStore, VectorStoreError};

/// Name of the ANN index managed by [`PgVectorStore::rebuild_index`].
const INDEX_NAME: &str = "embeddings_embedding_hnsw_idx";

/// Vector store backed by pgvector.
#[derive(Debug, Clone)]
pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Format a vector as a pgvector literal: `[0.1,0.2,...]`.
fn vector_literal(vector: &[f32]) -> String {
    format!(
        "[{}]",
        vector
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn insert(&self, record: EmbeddingRecord) -> Result<(), VectorStoreError> {
        sqlx::query(
            "INSERT INTO embeddings (id, embedding, text, meta) VALUES ($1, $2::vector, $3, $4)",
        )
        .bind(uuid::Uuid::now_v7())
        .bind(vector_literal(&record.vector))
        .bind(&record.text)
        .bind(&record.meta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>, VectorStoreError> {
        let rows = sqlx::query_as::<_, (String, Value)>(
            "SELECT text, meta FROM embeddings \
             ORDER BY embedding <=> $1::vector \
             LIMIT $2",
        )
        .bind(vector_literal(vector))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(text, meta)| SearchHit { text, meta })
            .collect())
    }

    async fn rebuild_index(&self) -> Result<(), VectorStoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP INDEX IF EXISTS {INDEX_NAME}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "CREATE INDEX {INDEX_NAME} ON embeddings USING hnsw (embedding vector_cosine_ops)"
        ))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
