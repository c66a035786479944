//! On-disk records of the code index.
//!
//! ```text
//! manifest.json              IndexManifest
//! files.json                 path -> FileState
//! YYYY-MM-DD/chunks.jsonl    one ChunkRecord per line
//! YYYY-MM-DD/partition.json  PartitionInfo
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VellumError};
use crate::journal::write_atomic;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const FILES_FILE: &str = "files.json";
pub const CHUNKS_FILE: &str = "chunks.jsonl";
pub const PARTITION_FILE: &str = "partition.json";

/// Top-level summary of every partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexManifest {
    pub partitions: BTreeMap<String, PartitionInfo>,
    pub total_chunks: usize,
    pub updated_at: Option<String>,
    /// Model that produced the stored embeddings.
    pub model: Option<String>,
    pub dimension: Option<usize>,
}

impl IndexManifest {
    pub fn record_partition(&mut self, info: PartitionInfo) {
        self.partitions.insert(info.date.clone(), info);
        self.total_chunks = self.partitions.values().map(|p| p.chunk_count).sum();
    }

    /// Recompute partition counts from the live file states. Chunks that a
    /// newer version of their file superseded are not counted.
    pub fn recount(&mut self, files: &FileIndex) {
        for info in self.partitions.values_mut() {
            info.chunk_count = 0;
            info.file_count = 0;
            for state in files.values().filter(|s| s.partition == info.date) {
                info.chunk_count += state.chunk_count;
                info.file_count += 1;
            }
        }
        self.total_chunks = self.partitions.values().map(|p| p.chunk_count).sum();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionInfo {
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    /// Live chunks, i.e. those of files whose current version lives here.
    pub chunk_count: usize,
    pub file_count: usize,
    pub generated_at: String,
}

/// What the index last saw of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileState {
    /// SHA-256 of the file contents, lowercase hex.
    pub content_hash: String,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: i64,
    pub size: u64,
    pub chunk_count: usize,
    /// Partition holding the chunks for `content_hash`.
    pub partition: String,
}

/// Incremental indexing state, keyed by absolute path.
pub type FileIndex = BTreeMap<String, FileState>;

/// One embedded chunk, stored as a JSON line in its partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub path: String,
    pub chunk_index: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub content_hash: String,
    pub text: String,
    #[serde(with = "crate::codec::serde_hex")]
    pub embedding: Vec<f32>,
    pub indexed_at: String,
}

/// Read a JSON document, treating a missing file as `T::default()`.
pub fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(VellumError::read(path, e)),
    }
}

/// Write a JSON document atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}
