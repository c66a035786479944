//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and three implementations, selected
//! by [`create_provider`] from `embedding.provider`:
//!
//! - `"local"`: [`local::LocalEmbeddingProvider`], ONNX Runtime inference with
//!   configurable pooling and optional L2 normalization. Semantic.
//! - `"hash"`: [`hash::HashEmbeddingProvider`], deterministic SHA-256 expansion.
//!   Not semantic.
//! - `"bridge"`: [`bridge::BridgeEmbeddingProvider`], delegates to a worker
//!   process over the stdin/stdout bridge protocol.

pub mod bridge;
pub mod hash;
pub mod local;
pub mod pooling;

use std::sync::OnceLock;

use crate::config::EmbeddingConfig;
use crate::error::{Result, VellumError};

/// Trait for embedding text into vectors.
///
/// All methods are synchronous and may block for tens to hundreds of
/// milliseconds; callers in async contexts should use
/// `tokio::task::spawn_blocking`, and should prefer one batch over many
/// single-text calls.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts. Returns one vector per input, in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| VellumError::Inference("provider returned no vector".into()))
    }

    /// Output dimension, once known. Lazily-loaded providers return `None`
    /// until their first call.
    fn dimensions(&self) -> Option<usize>;

    /// Identifier of the model (or procedure) producing the vectors.
    fn model_id(&self) -> &str;

    /// Whether similarity between outputs reflects meaning.
    fn is_semantic(&self) -> bool;

    /// Release any loaded model. The next call loads it again.
    fn dispose(&self) {}
}

/// Records the first output dimension of a provider and rejects later changes.
#[derive(Debug, Default)]
pub struct DimensionGuard {
    dimension: OnceLock<usize>,
}

impl DimensionGuard {
    pub fn get(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    /// Check every vector in a batch against the recorded dimension, recording it
    /// on first use.
    pub fn check(&self, vectors: &[Vec<f32>]) -> Result<()> {
        for v in vectors {
            let expected = *self.dimension.get_or_init(|| v.len());
            if v.len() != expected {
                return Err(VellumError::DimensionMismatch {
                    expected,
                    got: v.len(),
                });
            }
        }
        Ok(())
    }
}

/// Create an embedding provider from config.
///
/// The `local` provider does not touch the model until its first call, so a
/// missing download surfaces as an initialization error at that point rather
/// than here.
pub fn create_provider(config: &EmbeddingConfig) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Box::new(local::LocalEmbeddingProvider::new(config))),
        "hash" => Ok(Box::new(hash::HashEmbeddingProvider::new(config.dimension)?)),
        "bridge" => Ok(Box::new(bridge::BridgeEmbeddingProvider::new(&config.bridge))),
        other => anyhow::bail!(
            "unknown embedding provider: {other}. Supported: local, hash, bridge"
        ),
    }
}
