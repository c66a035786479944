//! Error taxonomy for the embedding, codec, bridge, and storage layers.
//!
//! Codec, dimension, and input errors are data errors and should be surfaced as-is.
//! Initialization, inference, and bridge errors are operational; see
//! [`VellumError::is_retryable`].

use std::path::PathBuf;

/// Errors produced by the `vellum` library.
#[derive(Debug, thiserror::Error)]
pub enum VellumError {
    /// A vector could not be encoded (non-finite component).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A hex string could not be decoded into a vector.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Two vectors (or a provider and a journal) disagree on dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The embedding backend could not be loaded.
    #[error("embedding backend failed to initialize: {0}")]
    Initialization(String),

    /// An embedding call failed after the backend was loaded.
    #[error("embedding inference failed: {0}")]
    Inference(String),

    /// The bridge subprocess did not answer in time and was killed.
    #[error("bridge call timed out after {timeout_ms} ms")]
    BridgeTimeout { timeout_ms: u64 },

    /// The bridge subprocess exited badly or produced an unusable response.
    #[error("bridge protocol error: {0}")]
    BridgeProtocol(String),

    #[error("failed to write {}: {source}", path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VellumError {
    /// Operational failures a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Initialization(_)
                | Self::Inference(_)
                | Self::BridgeTimeout { .. }
                | Self::BridgeProtocol(_)
        )
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageWrite {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageRead {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, VellumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operational_errors_are_retryable() {
        assert!(VellumError::Initialization("no model".into()).is_retryable());
        assert!(VellumError::Inference("oom".into()).is_retryable());
        assert!(VellumError::BridgeTimeout { timeout_ms: 10 }.is_retryable());
        assert!(VellumError::BridgeProtocol("bad json".into()).is_retryable());
    }

    #[test]
    fn data_errors_are_not_retryable() {
        assert!(!VellumError::Encoding("nan".into()).is_retryable());
        assert!(!VellumError::Decoding("odd".into()).is_retryable());
        assert!(!VellumError::DimensionMismatch { expected: 3, got: 4 }.is_retryable());
        assert!(!VellumError::InvalidInput("empty".into()).is_retryable());
    }

    #[test]
    fn dimension_mismatch_message() {
        let err = VellumError::DimensionMismatch {
            expected: 384,
            got: 768,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 384, got 768");
    }
}
