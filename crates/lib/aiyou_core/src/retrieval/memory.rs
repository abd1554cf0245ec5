//! In-memory vector store with exhaustive cosine search.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{EmbeddingRecord, SearchHit, VectorStore, VectorStoreError};

#[derive(Debug, Clone)]
struct Entry {
    record: EmbeddingRecord,
    norm: f64,
}

/// Process-local vector store. Used for development and tests.
#[derive(Debug)]
pub struct MemoryVectorStore {
    dimensions: usize,
    entries: RwLock<Vec<Entry>>,
}

impl MemoryVectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of all stored records, in insertion order.
    pub async fn records(&self) -> Vec<EmbeddingRecord> {
        self.entries
            .read()
            .await
            .iter()
            .map(|e| e.record.clone())
            .collect()
    }

    fn check(&self, vector: &[f32]) -> Result<(), VectorStoreError> {
        if vector.len() != self.dimensions {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

fn cosine(a: &[f32], norm_a: f64, b: &[f32], norm_b: f64) -> f64 {
    let denom = norm_a * norm_b;
    if denom == 0.0 {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    dot / denom
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn insert(&self, record: EmbeddingRecord) -> Result<(), VectorStoreError> {
        self.check(&record.vector)?;
        let norm = norm(&record.vector);
        self.entries.write().await.push(Entry { record, norm });
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchHit>, VectorStoreError> {
        self.check(vector)?;
        let query_norm = norm(vector);
        let entries = self.entries.read().await;

        let mut scored: Vec<(f64, &Entry)> = entries
            .iter()
            .map(|e| (cosine(vector, query_norm, &e.record.vector, e.norm), e))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, e)| SearchHit {
                text: e.record.text.clone(),
                meta: e.record.meta.clone(),
            })
            .collect())
    }

    async fn rebuild_index(&self) -> Result<(), VectorStoreError> {
        let mut entries = self.entries.write().await;
        for entry in entries.iter_mut() {
            entry.norm = norm(&entry.record.vector);
        }
        debug!(records = entries.len(), "recomputed in-memory index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn one_hot(i: usize, dims: usize) -> Vec<f32> {
        let mut v = vec![0.0; dims];
        v[i] = 1.0;
        v
    }

    fn record(i: usize, text: &str) -> EmbeddingRecord {
        EmbeddingRecord {
            vector: one_hot(i, 4),
            text: text.to_string(),
            meta: json!({ "source": "test" }),
        }
    }

    #[tokio::test]
    async fn exact_match_ranks_first() {
        let store = MemoryVectorStore::new(4);
        store.insert(record(0, "zero")).await.unwrap();
        store.insert(record(1, "one")).await.unwrap();
        store.insert(record(2, "two")).await.unwrap();

        let hits = store.search(&one_hot(1, 4), 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "one");
    }

    #[tokio::test]
    async fn wrong_dimensions_rejected() {
        let store = MemoryVectorStore::new(4);
        let mut bad = record(0, "bad");
        bad.vector = vec![1.0; 3];
        assert!(matches!(
            store.insert(bad).await,
            Err(VectorStoreError::DimensionMismatch { expected: 4, actual: 3 })
        ));
        assert!(store.search(&[1.0; 5], 1).await.is_err());
    }

    #[tokio::test]
    async fn rebuild_keeps_records_searchable() {
        let store = MemoryVectorStore::new(4);
        store.insert(record(3, "three")).await.unwrap();
        store.rebuild_index().await.unwrap();
        let hits = store.search(&one_hot(3, 4), 5).await.unwrap();
        assert_eq!(hits[0].text, "three");
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine(&[0.0, 0.0], 0.0, &[1.0, 0.0], 1.0), 0.0);
    }
}
