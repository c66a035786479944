//! Date-partitioned semantic index over source files.
//!
//! Files are split into overlapping line windows, embedded in batches, and
//! appended to the partition for the current UTC day. `files.json` remembers
//! the content hash each file had when it was last indexed, which both drives
//! incremental runs and lets [`CodeIndex::search`] ignore chunks left behind by
//! older versions of a file.

pub mod chunking;
pub mod manifest;

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, UNIX_EPOCH};

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::IndexingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, VellumError};
use crate::journal::ends_without_newline;
use crate::journal::types::now_timestamp;
use crate::similarity;

use chunking::{chunk_lines, CodeChunk};
pub use manifest::{ChunkRecord, FileIndex, FileState, IndexManifest, PartitionInfo};
use manifest::{read_json, write_json, CHUNKS_FILE, FILES_FILE, MANIFEST_FILE, PARTITION_FILE};

/// Directory names never descended into.
const SKIP_DIRS: &[&str] = &["target", "node_modules", ".git"];

#[derive(Debug, Serialize)]
pub struct IndexResult {
    pub status: &'static str,
    /// Files whose chunks were (re)written this run.
    pub files: usize,
    pub chunks: usize,
    /// Unchanged, oversized, binary, or non-UTF-8 files.
    pub skipped_files: usize,
    /// Files under the given directories that no longer exist.
    pub pruned_files: usize,
    pub duration_ms: u64,
    pub partition: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeSearchHit {
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_index: usize,
    pub score: f32,
    pub text: String,
    pub partition: String,
}

#[derive(Debug, Serialize)]
pub struct CodeSearchResponse {
    pub status: &'static str,
    pub query: String,
    pub count: usize,
    pub results: Vec<CodeSearchHit>,
}

impl CodeSearchResponse {
    pub fn new(query: &str, results: Vec<CodeSearchHit>) -> Self {
        Self {
            status: "success",
            query: query.to_string(),
            count: results.len(),
            results,
        }
    }
}

/// A file that passed the filters and changed since the last run.
struct PendingFile {
    key: String,
    hash: String,
    mtime: i64,
    size: u64,
    chunks: Vec<CodeChunk>,
}

pub struct CodeIndex {
    dir: PathBuf,
    provider: Arc<dyn EmbeddingProvider>,
    config: IndexingConfig,
}

impl CodeIndex {
    pub fn open(
        dir: impl Into<PathBuf>,
        provider: Arc<dyn EmbeddingProvider>,
        config: IndexingConfig,
    ) -> Self {
        Self {
            dir: dir.into(),
            provider,
            config,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> Result<IndexManifest> {
        read_json(&self.dir.join(MANIFEST_FILE))
    }

    pub fn file_states(&self) -> Result<FileIndex> {
        read_json(&self.dir.join(FILES_FILE))
    }

    /// Index every eligible file under `paths`.
    ///
    /// With `incremental`, files whose content hash matches the last run are
    /// skipped. All chunks of a run are embedded before anything is written,
    /// so a failed run leaves the index as it was.
    pub fn index(&self, paths: &[PathBuf], incremental: bool) -> Result<IndexResult> {
        let started = Instant::now();
        let partition = Utc::now().format("%Y-%m-%d").to_string();

        let mut manifest = self.manifest()?;
        let mut files = self.file_states()?;

        let mut pending = Vec::new();
        let mut skipped_files = 0;
        for path in self.collect_files(paths) {
            match self.prepare(&path, &files, incremental)? {
                Some(p) => pending.push(p),
                None => skipped_files += 1,
            }
        }

        let total_chunks: usize = pending.iter().map(|p| p.chunks.len()).sum();
        let records = self.embed_pending(&pending)?;

        if let (Some(expected), Some(first)) = (manifest.dimension, records.first()) {
            if first.embedding.len() != expected {
                return Err(VellumError::DimensionMismatch {
                    expected,
                    got: first.embedding.len(),
                });
            }
        }
        if let Some(previous) = manifest.model.as_deref() {
            if previous != self.provider.model_id() && !records.is_empty() {
                warn!(
                    previous,
                    current = self.provider.model_id(),
                    "index was built with a different model; re-index with --full"
                );
            }
        }

        let partition_dir = self.dir.join(&partition);
        if !records.is_empty() {
            self.append_chunks(&partition_dir, &records)?;
        }

        for p in &pending {
            files.insert(
                p.key.clone(),
                FileState {
                    content_hash: p.hash.clone(),
                    mtime: p.mtime,
                    size: p.size,
                    chunk_count: p.chunks.len(),
                    partition: partition.clone(),
                },
            );
        }

        let pruned_files = prune_deleted(&mut files, paths);

        if !pending.is_empty() {
            manifest.record_partition(PartitionInfo {
                date: partition.clone(),
                generated_at: now_timestamp(),
                ..PartitionInfo::default()
            });
        }
        manifest.recount(&files);
        for info in manifest.partitions.values() {
            let path = self.dir.join(&info.date).join(PARTITION_FILE);
            let on_disk: PartitionInfo = read_json(&path)?;
            if on_disk != *info {
                write_json(&path, info)?;
            }
        }

        if let Some(first) = records.first() {
            manifest.dimension = Some(first.embedding.len());
            manifest.model = Some(self.provider.model_id().to_string());
        }
        manifest.updated_at = Some(now_timestamp());

        write_json(&self.dir.join(FILES_FILE), &files)?;
        write_json(&self.dir.join(MANIFEST_FILE), &manifest)?;

        let result = IndexResult {
            status: "success",
            files: pending.len(),
            chunks: total_chunks,
            skipped_files,
            pruned_files,
            duration_ms: started.elapsed().as_millis() as u64,
            partition,
        };
        info!(
            files = result.files,
            chunks = result.chunks,
            skipped = result.skipped_files,
            pruned = result.pruned_files,
            duration_ms = result.duration_ms,
            partition = %result.partition,
            "index run complete"
        );
        Ok(result)
    }

    /// Expand `paths` into candidate files. Explicit file arguments bypass the
    /// extension filter; walked files do not.
    fn collect_files(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for root in paths {
            if root.is_file() {
                out.push(root.clone());
                continue;
            }
            if !root.is_dir() {
                warn!(path = %root.display(), "index path does not exist");
                continue;
            }
            for entry in WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_skipped(e))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if self.extension_allowed(entry.path()) {
                    out.push(entry.into_path());
                }
            }
        }
        out
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        if self.config.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Read, filter and chunk one file. `None` means skipped.
    fn prepare(
        &self,
        path: &Path,
        files: &FileIndex,
        incremental: bool,
    ) -> Result<Option<PendingFile>> {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                return Ok(None);
            }
        };
        if metadata.len() > self.config.max_file_bytes {
            debug!(path = %path.display(), size = metadata.len(), "skipping oversized file");
            return Ok(None);
        }

        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                return Ok(None);
            }
        };
        if bytes.contains(&0) {
            debug!(path = %path.display(), "skipping binary file");
            return Ok(None);
        }
        let content = match String::from_utf8(bytes) {
            Ok(c) => c,
            Err(_) => {
                debug!(path = %path.display(), "skipping non-UTF-8 file");
                return Ok(None);
            }
        };

        let key = file_key(path);
        let hash = hex::encode(Sha256::digest(content.as_bytes()));

        if incremental && files.get(&key).is_some_and(|s| s.content_hash == hash) {
            debug!(path = %key, "unchanged since last run");
            return Ok(None);
        }

        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Ok(Some(PendingFile {
            key,
            hash,
            mtime,
            size: metadata.len(),
            chunks: chunk_lines(&content, self.config.chunk_lines, self.config.chunk_overlap),
        }))
    }

    fn embed_pending(&self, pending: &[PendingFile]) -> Result<Vec<ChunkRecord>> {
        let all: Vec<(&PendingFile, &CodeChunk)> = pending
            .iter()
            .flat_map(|p| p.chunks.iter().map(move |c| (p, c)))
            .collect();

        let indexed_at = now_timestamp();
        let mut records = Vec::with_capacity(all.len());
        for batch in all.chunks(self.config.batch_size.max(1)) {
            let texts: Vec<&str> = batch.iter().map(|(_, c)| c.text.as_str()).collect();
            let vectors = self.provider.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(VellumError::Inference(format!(
                    "provider returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }
            for ((file, chunk), embedding) in batch.iter().zip(vectors) {
                records.push(ChunkRecord {
                    id: uuid::Uuid::now_v7().to_string(),
                    path: file.key.clone(),
                    chunk_index: chunk.chunk_index,
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    content_hash: file.hash.clone(),
                    text: chunk.text.clone(),
                    embedding,
                    indexed_at: indexed_at.clone(),
                });
            }
            debug!(batch = batch.len(), done = records.len(), total = all.len(), "embedded chunks");
        }
        Ok(records)
    }

    fn append_chunks(&self, partition_dir: &Path, records: &[ChunkRecord]) -> Result<()> {
        fs::create_dir_all(partition_dir).map_err(|e| VellumError::write(partition_dir, e))?;

        let mut body = String::new();
        for record in records {
            body.push_str(&serde_json::to_string(record)?);
            body.push('\n');
        }

        let path = partition_dir.join(CHUNKS_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| VellumError::write(&path, e))?;
        if ends_without_newline(&mut file).map_err(|e| VellumError::write(&path, e))? {
            body.insert(0, '\n');
        }
        file.write_all(body.as_bytes())
            .map_err(|e| VellumError::write(&path, e))
    }

    /// Rank current chunks against `query`.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<CodeSearchHit>> {
        let files = self.file_states()?;
        let manifest = self.manifest()?;

        // (path, chunk_index) -> (partition, record); later partitions and lines win
        let mut current: HashMap<(String, usize), (String, ChunkRecord)> = HashMap::new();
        for date in manifest.partitions.keys() {
            for record in self.read_partition(date)? {
                let live = files.get(&record.path).is_some_and(|s| {
                    s.content_hash == record.content_hash && &s.partition == date
                });
                if live {
                    current.insert(
                        (record.path.clone(), record.chunk_index),
                        (date.clone(), record),
                    );
                }
            }
        }

        if current.is_empty() || limit == 0 {
            return Ok(vec![]);
        }

        let mut candidates: Vec<(String, ChunkRecord)> = current.into_values().collect();
        candidates.sort_by(|a, b| {
            (&a.1.path, a.1.chunk_index).cmp(&(&b.1.path, b.1.chunk_index))
        });

        let query_vec = self.provider.embed(query)?;
        let ranked = similarity::top_k(
            &query_vec,
            candidates
                .iter()
                .enumerate()
                .map(|(i, (_, r))| (i, r.embedding.as_slice())),
            limit,
            None,
        )?;

        Ok(ranked
            .into_iter()
            .map(|hit| {
                let (partition, record) = &candidates[hit.id];
                CodeSearchHit {
                    path: record.path.clone(),
                    start_line: record.start_line,
                    end_line: record.end_line,
                    chunk_index: record.chunk_index,
                    score: hit.score,
                    text: record.text.clone(),
                    partition: partition.clone(),
                }
            })
            .collect())
    }

    fn read_partition(&self, date: &str) -> Result<Vec<ChunkRecord>> {
        let path = self.dir.join(date).join(CHUNKS_FILE);
        let file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(VellumError::read(&path, e)),
        };

        let mut records = Vec::new();
        for (i, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line.map_err(|e| VellumError::read(&path, e))?;
            let raw = line.trim_ascii();
            if raw.is_empty() {
                continue;
            }
            match serde_json::from_slice::<ChunkRecord>(raw) {
                Ok(r) => records.push(r),
                Err(e) => {
                    warn!(path = %path.display(), line = i + 1, error = %e, "skipping chunk line")
                }
            }
        }
        Ok(records)
    }
}

/// Forget files under the directory `roots` that are gone from disk, so their
/// chunks stop matching in search. Returns how many were dropped.
fn prune_deleted(files: &mut FileIndex, roots: &[PathBuf]) -> usize {
    let dirs: Vec<PathBuf> = roots
        .iter()
        .filter(|r| r.is_dir())
        .filter_map(|r| fs::canonicalize(r).ok())
        .collect();
    if dirs.is_empty() {
        return 0;
    }

    let before = files.len();
    files.retain(|key, _| {
        let path = Path::new(key);
        let gone = dirs.iter().any(|d| path.starts_with(d)) && !path.exists();
        if gone {
            debug!(path = %key, "file removed since last run");
        }
        !gone
    });
    before - files.len()
}

/// Key of `path` in `files.json`: the canonical path when it resolves.
fn file_key(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && SKIP_DIRS.iter().any(|d| name == *d))
}
