//! Cross-runtime embedding bridge.
//!
//! One request/response exchange per subprocess: the caller writes a single
//! [`BridgeRequest`] JSON object to the child's stdin and closes it, the child
//! writes a single [`BridgeResponse`] object to stdout and exits.
//!
//! ```text
//! -> {"texts": ["a", "b"], "format": "hex"}
//! <- {"status": "success", "count": 2, "dimension": 384, "embeddings": ["0000803f...", "..."]}
//! <- {"status": "error", "error": "model not found"}
//! ```
//!
//! [`client::BridgeClient`] is the caller side, [`worker`] is the side that
//! `vellum embed-worker` runs.

pub mod client;
pub mod worker;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{Result, VellumError};

/// Representation of vectors in a success response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingFormat {
    #[default]
    Hex,
    Array,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub texts: Vec<String>,
    #[serde(default)]
    pub format: EmbeddingFormat,
}

impl BridgeRequest {
    pub fn hex(texts: &[&str]) -> Self {
        Self {
            texts: texts.iter().map(|t| t.to_string()).collect(),
            format: EmbeddingFormat::Hex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Embeddings {
    Hex(Vec<String>),
    Array(Vec<Vec<f32>>),
}

impl Embeddings {
    fn len(&self) -> usize {
        match self {
            Self::Hex(v) => v.len(),
            Self::Array(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BridgeResponse {
    Success {
        count: usize,
        dimension: usize,
        embeddings: Embeddings,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

impl BridgeResponse {
    /// Build a success response from computed vectors.
    pub fn success(vectors: &[Vec<f32>], format: EmbeddingFormat) -> Result<Self> {
        let dimension = vectors.first().map_or(0, Vec::len);
        let embeddings = match format {
            EmbeddingFormat::Hex => Embeddings::Hex(
                vectors
                    .iter()
                    .map(|v| codec::encode(v))
                    .collect::<Result<_>>()?,
            ),
            EmbeddingFormat::Array => Embeddings::Array(vectors.to_vec()),
        };
        Ok(Self::Success {
            count: vectors.len(),
            dimension,
            embeddings,
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
            stack: None,
        }
    }

    /// Validate a response against the request that produced it and return the
    /// decoded vectors in request order.
    pub fn into_vectors(self, expected_count: usize) -> Result<Vec<Vec<f32>>> {
        let (count, dimension, embeddings) = match self {
            Self::Success {
                count,
                dimension,
                embeddings,
            } => (count, dimension, embeddings),
            Self::Error { error, .. } => {
                return Err(VellumError::BridgeProtocol(format!("worker reported: {error}")))
            }
        };

        if count != expected_count || embeddings.len() != expected_count {
            return Err(VellumError::BridgeProtocol(format!(
                "expected {expected_count} embeddings, response declared {count} and carried {}",
                embeddings.len()
            )));
        }

        let vectors = match embeddings {
            Embeddings::Hex(encoded) => encoded
                .iter()
                .map(|h| codec::decode(h, dimension))
                .collect::<Result<Vec<_>>>()?,
            Embeddings::Array(vectors) => vectors,
        };

        if let Some(v) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(VellumError::DimensionMismatch {
                expected: dimension,
                got: v.len(),
            });
        }
        Ok(vectors)
    }
}
