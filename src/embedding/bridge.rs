//! Embedding provider that delegates to a worker process over the bridge.

use super::{DimensionGuard, EmbeddingProvider};
use crate::bridge::client::BridgeClient;
use crate::bridge::BridgeRequest;
use crate::config::BridgeConfig;
use crate::error::Result;

pub struct BridgeEmbeddingProvider {
    client: BridgeClient,
    model_id: String,
    guard: DimensionGuard,
}

impl BridgeEmbeddingProvider {
    pub fn new(config: &BridgeConfig) -> Self {
        Self::with_client(BridgeClient::from_config(config))
    }

    pub fn with_client(client: BridgeClient) -> Self {
        Self {
            model_id: format!("bridge:{}", client.command()),
            client,
            guard: DimensionGuard::default(),
        }
    }
}

impl EmbeddingProvider for BridgeEmbeddingProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let vectors = self
            .client
            .request_blocking(&BridgeRequest::hex(texts))?
            .into_vectors(texts.len())?;
        self.guard.check(&vectors)?;
        tracing::debug!(batch = texts.len(), model = %self.model_id, "embedded batch via bridge");
        Ok(vectors)
    }

    fn dimensions(&self) -> Option<usize> {
        self.guard.get()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn is_semantic(&self) -> bool {
        // the worker side decides; assume a real model sits behind it
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::VellumError;

    fn scripted(output: &str) -> BridgeEmbeddingProvider {
        let script = format!("cat >/dev/null; echo '{output}'");
        BridgeEmbeddingProvider::with_client(BridgeClient::new(
            "sh",
            vec!["-c".into(), script],
            Duration::from_secs(5),
        ))
    }

    #[test]
    fn decodes_worker_vectors() {
        let provider = scripted(
            r#"{"status":"success","count":2,"dimension":1,"embeddings":["0000803f","000000c0"]}"#,
        );
        let vectors = provider.embed_batch(&["a", "b"]).unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![-2.0]]);
        assert_eq!(provider.dimensions(), Some(1));
        assert_eq!(provider.model_id(), "bridge:sh");
    }

    #[test]
    fn short_response_rejected() {
        let provider =
            scripted(r#"{"status":"success","count":1,"dimension":1,"embeddings":["0000803f"]}"#);
        assert!(matches!(
            provider.embed_batch(&["a", "b"]),
            Err(VellumError::BridgeProtocol(_))
        ));
    }

    #[test]
    fn empty_batch_spawns_nothing() {
        let provider = BridgeEmbeddingProvider::with_client(BridgeClient::new(
            "/nonexistent/worker",
            vec![],
            Duration::from_secs(1),
        ));
        assert!(provider.embed_batch(&[]).unwrap().is_empty());
    }
}
