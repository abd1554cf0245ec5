//! Local deterministic embedding provider using FNV-1a hash.
//!
//! Produces repeatable embeddings with no external dependencies. Identical
//! texts map to identical vectors, so an exact-match query always ranks its
//! own document first; useful for tests and offline development.

use async_trait::async_trait;

use super::{Embedder, EmbeddingError};

/// Deterministic hash-seeded embedder.
#[derive(Debug, Clone, Copy)]
pub struct LocalEmbedder {
    dimensions: usize,
}

impl LocalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(embed(text, self.dimensions))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Seed an xorshift PRNG from the FNV-1a hash of `text` and fill `[-1, 1]`.
pub fn embed(text: &str, dimensions: usize) -> Vec<f32> {
    let mut seed: u32 = 2_166_136_261;
    for byte in text.bytes() {
        seed ^= byte as u32;
        seed = seed.wrapping_mul(16_777_619);
    }

    // Xorshift gets stuck at zero.
    let mut x = if seed == 0 { 0x9E37_79B9 } else { seed };
    (0..dimensions)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            let normalized = (x as f64) / (u32::MAX as f64);
            (normalized * 2.0 - 1.0) as f32
        })
        .collect()
}
