//! Caller side of the bridge: one subprocess per request, bounded by a timeout.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::{Handle, RuntimeFlavor};

use super::{BridgeRequest, BridgeResponse};
use crate::config::BridgeConfig;
use crate::error::{Result, VellumError};

/// Longest stderr excerpt carried in a protocol error.
const STDERR_TAIL: usize = 512;

#[derive(Debug, Clone)]
pub struct BridgeClient {
    command: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    timeout: Duration,
}

impl BridgeClient {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            env: Vec::new(),
            timeout,
        }
    }

    /// Client for the configured worker. The worker is told which in-process
    /// provider to use through `VELLUM_EMBEDDING_PROVIDER`, so it does not pick
    /// up `provider = "bridge"` from a config file it shares with the caller.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_millis(config.timeout_ms),
        )
        .with_env("VELLUM_EMBEDDING_PROVIDER", &config.worker_provider)
    }

    /// Set an environment variable for every spawned worker.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run one exchange with a fresh subprocess.
    ///
    /// The child is spawned with `kill_on_drop`, so when the timeout fires the
    /// in-flight future (and with it the child) is dropped and the process killed.
    pub async fn request(&self, request: &BridgeRequest) -> Result<BridgeResponse> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                VellumError::Initialization(format!(
                    "failed to spawn bridge command `{}`: {e}",
                    self.command
                ))
            })?;

        let stdin = child.stdin.take();
        let exchange = async move {
            if let Some(mut pipe) = stdin {
                match pipe.write_all(&payload).await {
                    // a worker that exits without reading still gets its output judged
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
                drop(pipe);
            }
            child.wait_with_output().await
        };

        let timeout_ms = self.timeout.as_millis() as u64;
        let output = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                tracing::warn!(command = %self.command, timeout_ms, "bridge call timed out, worker killed");
                VellumError::BridgeTimeout { timeout_ms }
            })?
            .map_err(|e| VellumError::BridgeProtocol(format!("bridge I/O failed: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let parsed = serde_json::from_str::<BridgeResponse>(stdout.trim());

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let detail = match parsed {
                Ok(BridgeResponse::Error { error, .. }) => error,
                _ => tail(&stderr).to_string(),
            };
            return Err(VellumError::BridgeProtocol(format!(
                "worker exited with status {code}: {detail}"
            )));
        }

        parsed.map_err(|e| {
            let mut message = format!("malformed worker output: {e}");
            let stderr_tail = tail(&stderr);
            if !stderr_tail.is_empty() {
                message.push_str(&format!(" (stderr: {stderr_tail})"));
            }
            VellumError::BridgeProtocol(message)
        })
    }

    /// Embed `texts` through the worker and validate the response.
    pub async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.request(&BridgeRequest::hex(texts))
            .await?
            .into_vectors(texts.len())
    }

    /// Synchronous form of [`request`](Self::request).
    ///
    /// Uses the ambient multi-threaded runtime when there is one. From a
    /// current-thread runtime, or outside any runtime, the exchange runs on a
    /// private current-thread runtime.
    pub fn request_blocking(&self, request: &BridgeRequest) -> Result<BridgeResponse> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.request(request)))
            }
            // a current-thread runtime cannot be blocked from inside; use another thread
            Ok(_) => std::thread::scope(|s| {
                s.spawn(|| self.request_on_private_runtime(request))
                    .join()
                    .map_err(|_| VellumError::BridgeProtocol("bridge thread panicked".into()))?
            }),
            Err(_) => self.request_on_private_runtime(request),
        }
    }

    fn request_on_private_runtime(&self, request: &BridgeRequest) -> Result<BridgeResponse> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| VellumError::Initialization(format!("failed to start bridge runtime: {e}")))?;
        runtime.block_on(self.request(request))
    }
}

fn tail(s: &str) -> &str {
    let s = s.trim();
    if s.len() <= STDERR_TAIL {
        return s;
    }
    let mut start = s.len() - STDERR_TAIL;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
