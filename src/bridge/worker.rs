//! Worker side of the bridge, run as `vellum embed-worker`.
//!
//! Reads one request from stdin, writes one response to stdout. Logs go to
//! stderr, so stdout carries nothing but the response object.

use std::io::{Read, Write};

use super::{BridgeRequest, BridgeResponse};
use crate::config::EmbeddingConfig;
use crate::embedding::{self, EmbeddingProvider};

/// Answer a raw request with the given provider.
pub fn handle(provider: &dyn EmbeddingProvider, raw: &str) -> BridgeResponse {
    let request: BridgeRequest = match serde_json::from_str(raw) {
        Ok(r) => r,
        Err(e) => return BridgeResponse::error(format!("invalid request: {e}")),
    };

    let texts: Vec<&str> = request.texts.iter().map(String::as_str).collect();
    let result = provider
        .embed_batch(&texts)
        .and_then(|vectors| BridgeResponse::success(&vectors, request.format));

    match result {
        Ok(response) => {
            tracing::info!(count = texts.len(), model = provider.model_id(), "bridge request served");
            response
        }
        Err(e) => BridgeResponse::error(e.to_string()),
    }
}

/// Serve one request from `input` to `output`. Returns the process exit code.
pub fn serve(config: &EmbeddingConfig, mut input: impl Read, mut output: impl Write) -> anyhow::Result<i32> {
    let mut raw = String::new();
    input.read_to_string(&mut raw)?;

    let response = match worker_provider(config) {
        Ok(provider) => {
            let response = handle(provider.as_ref(), &raw);
            provider.dispose();
            response
        }
        Err(e) => BridgeResponse::error(e.to_string()),
    };

    serde_json::to_writer(&mut output, &response)?;
    writeln!(output)?;
    output.flush()?;

    Ok(match response {
        BridgeResponse::Success { .. } => 0,
        BridgeResponse::Error { error, .. } => {
            tracing::error!(%error, "bridge request failed");
            1
        }
    })
}

/// Serve one request over the process's stdin and stdout.
pub fn run(config: &EmbeddingConfig) -> anyhow::Result<i32> {
    serve(config, std::io::stdin().lock(), std::io::stdout().lock())
}

fn worker_provider(config: &EmbeddingConfig) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    if config.provider == "bridge" {
        anyhow::bail!(
            "embed-worker cannot use the bridge provider itself; set embedding.bridge.worker_provider to local or hash"
        );
    }
    embedding::create_provider(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    fn hash_config(dimension: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "hash".into(),
            dimension,
            ..EmbeddingConfig::default()
        }
    }

    fn run_worker(config: &EmbeddingConfig, input: &str) -> (i32, serde_json::Value) {
        let mut out = Vec::new();
        let code = serve(config, input.as_bytes(), &mut out).unwrap();
        (code, serde_json::from_slice(&out).unwrap())
    }

    #[test]
    fn serves_hex_embeddings() {
        let (code, value) = run_worker(&hash_config(16), r#"{"texts":["a","b"],"format":"hex"}"#);
        assert_eq!(code, 0);
        assert_eq!(value["status"], "success");
        assert_eq!(value["count"], 2);
        assert_eq!(value["dimension"], 16);
        for h in value["embeddings"].as_array().unwrap() {
            assert_eq!(codec::decode(h.as_str().unwrap(), 16).unwrap().len(), 16);
        }
    }

    #[test]
    fn serves_array_embeddings() {
        let (code, value) = run_worker(&hash_config(4), r#"{"texts":["a"],"format":"array"}"#);
        assert_eq!(code, 0);
        assert_eq!(value["embeddings"][0].as_array().unwrap().len(), 4);
    }

    #[test]
    fn bad_request_exits_nonzero() {
        let (code, value) = run_worker(&hash_config(4), "{not json");
        assert_eq!(code, 1);
        assert_eq!(value["status"], "error");
        assert!(value["error"].as_str().unwrap().contains("invalid request"));
    }

    #[test]
    fn refuses_bridge_provider() {
        let config = EmbeddingConfig {
            provider: "bridge".into(),
            ..EmbeddingConfig::default()
        };
        let (code, value) = run_worker(&config, r#"{"texts":["a"]}"#);
        assert_eq!(code, 1);
        assert!(value["error"].as_str().unwrap().contains("bridge provider"));
    }
}
