//! Bridge contract tests against the real `vellum embed-worker` binary.

mod helpers;

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use vellum::bridge::client::BridgeClient;
use vellum::codec;
use vellum::embedding::bridge::BridgeEmbeddingProvider;
use vellum::embedding::EmbeddingProvider;
use vellum::VellumError;

const BIN: &str = env!("CARGO_BIN_EXE_vellum");

/// Worker arguments pinned to a hash-provider config in `dir`.
fn worker_args(dir: &std::path::Path) -> Vec<String> {
    let config = dir.join("config.toml");
    std::fs::write(
        &config,
        "[server]\nlog_level = \"warn\"\n\n[embedding]\nprovider = \"hash\"\ndimension = 384\n",
    )
    .unwrap();
    vec![
        "--config".into(),
        config.to_string_lossy().into_owned(),
        "embed-worker".into(),
    ]
}

fn run_worker(dir: &std::path::Path, stdin: &str) -> (i32, serde_json::Value) {
    let mut child = Command::new(BIN)
        .args(worker_args(dir))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let value = serde_json::from_slice(&output.stdout).unwrap();
    (output.status.code().unwrap(), value)
}

#[test]
fn worker_answers_hex_request() {
    let dir = tempfile::tempdir().unwrap();
    let (code, value) = run_worker(dir.path(), r#"{"texts":["a","b"],"format":"hex"}"#);

    assert_eq!(code, 0);
    assert_eq!(value["status"], "success");
    assert_eq!(value["count"], 2);
    let dimension = value["dimension"].as_u64().unwrap() as usize;
    assert_eq!(dimension, 384);

    let embeddings = value["embeddings"].as_array().unwrap();
    assert_eq!(embeddings.len(), 2);
    for h in embeddings {
        let v = codec::decode(h.as_str().unwrap(), dimension).unwrap();
        assert_eq!(v.len(), dimension);
    }
    assert_ne!(embeddings[0], embeddings[1]);
}

#[test]
fn worker_rejects_malformed_request() {
    let dir = tempfile::tempdir().unwrap();
    let (code, value) = run_worker(dir.path(), "this is not json");
    assert_eq!(code, 1);
    assert_eq!(value["status"], "error");
    assert!(value["error"].is_string());
}

#[test]
fn provider_round_trips_through_worker() {
    let dir = tempfile::tempdir().unwrap();
    let provider = BridgeEmbeddingProvider::with_client(BridgeClient::new(
        BIN,
        worker_args(dir.path()),
        Duration::from_secs(30),
    ));

    let batch = provider.embed_batch(&["hello", "world"]).unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(provider.dimensions(), Some(384));

    // same text, same vector as the in-process hash provider
    let local = helpers::hash_provider(384);
    assert_eq!(batch[0], local.embed("hello").unwrap());
    // batching does not change per-item output
    assert_eq!(provider.embed("world").unwrap(), batch[1]);
}

#[tokio::test]
async fn slow_worker_times_out() {
    let client = BridgeClient::new(
        "sh",
        vec!["-c".into(), "sleep 10".into()],
        Duration::from_millis(300),
    );
    let started = std::time::Instant::now();
    let err = client.embed(&["a"]).await.unwrap_err();
    assert!(matches!(err, VellumError::BridgeTimeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn garbage_output_is_protocol_error() {
    let client = BridgeClient::new(
        "sh",
        vec!["-c".into(), "cat >/dev/null; printf '{\"status\":\"succ'".into()],
        Duration::from_secs(5),
    );
    assert!(matches!(
        client.embed(&["a"]).await,
        Err(VellumError::BridgeProtocol(_))
    ));
}

#[tokio::test]
async fn wrong_count_is_protocol_error() {
    let client = BridgeClient::new(
        "sh",
        vec![
            "-c".into(),
            r#"cat >/dev/null; echo '{"status":"success","count":1,"dimension":1,"embeddings":["0000803f"]}'"#.into(),
        ],
        Duration::from_secs(5),
    );
    assert!(matches!(
        client.embed(&["a", "b"]).await,
        Err(VellumError::BridgeProtocol(_))
    ));
}

#[test]
fn default_bridge_config_reaches_a_working_worker() {
    // only the provider and the worker binary differ from the defaults
    let mut config = vellum::config::EmbeddingConfig::default();
    config.provider = "bridge".into();
    config.bridge.command = BIN.into();
    config.bridge.worker_provider = "hash".into();

    let provider = vellum::embedding::create_provider(&config).unwrap();
    let batch = provider.embed_batch(&["first", "second"]).unwrap();
    assert_eq!(batch.len(), 2);
    assert!(!batch[0].is_empty());
    assert_eq!(batch[0].len(), batch[1].len());
    assert_eq!(provider.embed("first").unwrap(), batch[0]);
}
