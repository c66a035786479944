//! Deterministic, offline embedding provider.
//!
//! Vectors are expanded from a SHA-256 digest of the text. Identical text always
//! yields an identical vector and distinct texts almost surely yield distinct
//! vectors, but **similarity scores are not meaningful**: two paraphrases are as
//! far apart as two unrelated sentences. Use it for tests, offline setups, and
//! as a stand-in until a semantic model is available.

use sha2::{Digest, Sha256};

use super::EmbeddingProvider;
use crate::error::{Result, VellumError};
use crate::similarity::l2_normalize;

/// Hash-derived pseudo-embeddings of a fixed dimension.
pub struct HashEmbeddingProvider {
    dimension: usize,
    model_id: String,
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(VellumError::InvalidInput(
                "hash embedding dimension must be positive".into(),
            ));
        }
        Ok(Self {
            dimension,
            model_id: format!("hash-sha256-{dimension}"),
        })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let seed = Sha256::digest(text.as_bytes());
        let mut out = Vec::with_capacity(self.dimension);
        let mut block: u32 = 0;

        while out.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(seed);
            hasher.update(block.to_le_bytes());
            let digest = hasher.finalize();

            for word in digest.chunks_exact(4) {
                if out.len() == self.dimension {
                    break;
                }
                let w = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
                // map to [-1, 1]
                out.push((w as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32);
            }
            block += 1;
        }

        l2_normalize(&out)
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimension)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn is_semantic(&self) -> bool {
        false
    }
}
