//! Embedding generation capability.

use async_trait::async_trait;

use crate::keywords::tokenize;
use crate::types::{ZptError, ZptResult};

/// Default dimension for the local hashing embedder.
pub const EMBEDDING_DIM: usize = 384;

/// Anything that can turn text into a dense vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn generate_embedding(&self, text: &str) -> ZptResult<Vec<f32>>;

    fn dimension(&self) -> usize;
}

/// Deterministic feature-hashing embedder.
///
/// Used when no model-backed provider is configured. Tokens are hashed into
/// buckets with a signed weight and the result is L2-normalised, so texts
/// that share vocabulary score high under cosine similarity.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dim as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn generate_embedding(&self, text: &str) -> ZptResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(ZptError::Embedding(
                "cannot embed empty text".to_string(),
            ));
        }
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
