use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::embedding::pooling::Pooling;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct VellumConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub indexing: IndexingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub journal_path: String,
    pub index_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"local"` (ONNX), `"hash"` (deterministic, non-semantic), or `"bridge"` (subprocess).
    pub provider: String,
    /// Hugging Face model id, e.g. `sentence-transformers/all-MiniLM-L6-v2`.
    pub model: String,
    pub cache_dir: String,
    pub pooling: Pooling,
    pub normalize: bool,
    /// Output dimension of the hash provider.
    pub dimension: usize,
    pub max_seq_len: usize,
    /// Upper bound on a single embedding call made from the MCP server.
    pub timeout_ms: u64,
    pub bridge: BridgeConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BridgeConfig {
    pub command: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
    /// Provider the worker embeds with ("local" or "hash").
    pub worker_provider: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_list_limit: usize,
    pub default_search_limit: usize,
    pub min_score: Option<f32>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexingConfig {
    pub chunk_lines: usize,
    pub chunk_overlap: usize,
    pub max_file_bytes: u64,
    pub batch_size: usize,
    /// File extensions to index. Empty means every text file.
    pub extensions: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8001,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_vellum_dir();
        Self {
            journal_path: dir.join("journal.jsonl").to_string_lossy().into_owned(),
            index_dir: dir.join("index").to_string_lossy().into_owned(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_vellum_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "sentence-transformers/all-MiniLM-L6-v2".into(),
            cache_dir,
            pooling: Pooling::Mean,
            normalize: true,
            dimension: 384,
            max_seq_len: 256,
            timeout_ms: 30_000,
            bridge: BridgeConfig::default(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command: "vellum".into(),
            args: vec!["embed-worker".into()],
            timeout_ms: 30_000,
            worker_provider: "local".into(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_list_limit: 10,
            default_search_limit: 5,
            min_score: None,
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_lines: 60,
            chunk_overlap: 10,
            max_file_bytes: 1024 * 1024,
            batch_size: 32,
            extensions: [
                "rs", "py", "js", "jsx", "ts", "tsx", "go", "java", "c", "h", "cpp", "hpp",
                "rb", "sh", "toml", "yaml", "yml", "json", "md",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Returns `~/.vellum/`
pub fn default_vellum_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vellum")
}

/// Returns the default config file path: `~/.vellum/config.toml`
pub fn default_config_path() -> PathBuf {
    default_vellum_dir().join("config.toml")
}

impl VellumConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            VellumConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (VELLUM_JOURNAL, VELLUM_INDEX_DIR,
    /// VELLUM_EMBEDDING_PROVIDER, VELLUM_MODEL, VELLUM_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("VELLUM_JOURNAL") {
            self.storage.journal_path = val;
        }
        if let Ok(val) = std::env::var("VELLUM_INDEX_DIR") {
            self.storage.index_dir = val;
        }
        if let Ok(val) = std::env::var("VELLUM_EMBEDDING_PROVIDER") {
            self.embedding.provider = val;
        }
        if let Ok(val) = std::env::var("VELLUM_MODEL") {
            self.embedding.model = val;
        }
        if let Ok(val) = std::env::var("VELLUM_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the journal log path, expanding `~` if needed.
    pub fn resolved_journal_path(&self) -> PathBuf {
        expand_tilde(&self.storage.journal_path)
    }

    /// Resolve the code index directory, expanding `~` if needed.
    pub fn resolved_index_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.index_dir)
    }
}

impl EmbeddingConfig {
    /// Directory holding `model.onnx` and `tokenizer.json` for the configured model.
    pub fn model_dir(&self) -> PathBuf {
        expand_tilde(&self.cache_dir).join(self.model.replace('/', "--"))
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
