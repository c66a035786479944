//! Append-only journal of embedded text entries.
//!
//! The log is a JSON Lines file, one [`JournalEntry`] per line. Writers append a
//! complete line with a single `write_all`; readers parse every line on its own
//! and drop the ones that fail, so a torn final line never hides the entries
//! before it. Search is a linear cosine scan over all stored embeddings.

pub mod responses;
pub mod types;

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{Result, VellumError};
use crate::similarity;

pub use types::{
    normalize_tags, parse_tag_list, JournalEntry, JournalStats, LineOutcome, ReadOutcome,
    SearchResult, SkippedLine,
};

/// A journal file paired with the provider that embeds its entries.
pub struct Journal {
    path: PathBuf,
    provider: Arc<dyn EmbeddingProvider>,
}

impl Journal {
    /// Open a journal at `path`. Nothing is created until the first write.
    pub fn open(path: impl Into<PathBuf>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            path: path.into(),
            provider,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    /// Embed `text` and append it as a new entry.
    pub fn add<I, S>(&self, text: &str, tags: I) -> Result<JournalEntry>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        check_text(text)?;
        let embedding = self.provider.embed(text)?;
        self.add_embedded(text, tags, embedding)
    }

    /// Append an entry whose embedding was computed by the caller.
    ///
    /// Lets callers bound the embedding step on its own, so nothing is
    /// written once they have given up on the call.
    pub fn add_embedded<I, S>(&self, text: &str, tags: I, embedding: Vec<f32>) -> Result<JournalEntry>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        check_text(text)?;
        let tags = normalize_tags(tags);

        if let Some(expected) = self.stored_dimension()? {
            if embedding.len() != expected {
                return Err(VellumError::DimensionMismatch {
                    expected,
                    got: embedding.len(),
                });
            }
        }

        let entry = JournalEntry::new(text, tags, embedding);
        self.append(&entry)?;

        info!(
            id = %entry.id,
            tags = entry.tags.len(),
            dimension = entry.dimension(),
            "journal entry added"
        );
        Ok(entry)
    }

    fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| VellumError::write(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| VellumError::write(&self.path, e))?;

        // never glue a new entry onto an unterminated tail
        if ends_without_newline(&mut file).map_err(|e| VellumError::write(&self.path, e))? {
            line.insert(0, '\n');
        }

        file.write_all(line.as_bytes())
            .map_err(|e| VellumError::write(&self.path, e))
    }

    /// Most recent entries first, at most `limit`.
    pub fn list(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        Ok(self.list_with_total(limit)?.0)
    }

    /// Like [`list`](Self::list), also returning how many entries are stored.
    pub fn list_with_total(&self, limit: usize) -> Result<(Vec<JournalEntry>, usize)> {
        let mut entries = self.read_all()?.entries;
        let total = entries.len();
        entries.reverse();
        entries.truncate(limit);
        Ok((entries, total))
    }

    /// Rank stored entries by cosine similarity to `query`.
    ///
    /// An empty journal returns no results without touching the provider.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchResult>> {
        let entries = self.read_all()?.entries;
        if entries.is_empty() || limit == 0 {
            return Ok(vec![]);
        }

        let query_vec = self.provider.embed(query)?;
        let ranked = similarity::top_k(
            &query_vec,
            entries.iter().enumerate().map(|(i, e)| (i, e.embedding.as_slice())),
            limit,
            threshold,
        )?;

        Ok(ranked
            .into_iter()
            .map(|hit| SearchResult {
                entry: entries[hit.id].clone(),
                score: hit.score,
            })
            .collect())
    }

    pub fn stats(&self) -> Result<JournalStats> {
        let outcome = self.read_all()?;

        let mut tag_counts = BTreeMap::new();
        for entry in &outcome.entries {
            for tag in &entry.tags {
                *tag_counts.entry(tag.clone()).or_insert(0) += 1;
            }
        }

        let file_size_bytes = match fs::metadata(&self.path) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(VellumError::read(&self.path, e)),
        };

        let storage_path = fs::canonicalize(&self.path)
            .unwrap_or_else(|_| self.path.clone())
            .to_string_lossy()
            .into_owned();

        Ok(JournalStats {
            total_entries: outcome.entries.len(),
            tag_counts,
            storage_path,
            skipped_lines: outcome.skipped.len(),
            dimension: outcome.entries.first().map(JournalEntry::dimension),
            oldest_entry: outcome.entries.iter().map(|e| e.ts.clone()).min(),
            newest_entry: outcome.entries.iter().map(|e| e.ts.clone()).max(),
            file_size_bytes,
        })
    }

    /// Read every parseable entry in file order. A missing file reads as empty.
    pub fn read_all(&self) -> Result<ReadOutcome> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ReadOutcome::default()),
            Err(e) => return Err(VellumError::read(&self.path, e)),
        };

        let mut outcome = ReadOutcome::default();
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut line_no = 0;

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| VellumError::read(&self.path, e))?;
            if n == 0 {
                break;
            }
            line_no += 1;

            let raw = buf.trim_ascii();
            if raw.is_empty() {
                continue;
            }

            match LineOutcome::parse(raw) {
                LineOutcome::Entry(entry) => outcome.entries.push(entry),
                LineOutcome::Skip(reason) => {
                    warn!(path = %self.path.display(), line = line_no, %reason, "skipping journal line");
                    outcome.skipped.push(SkippedLine {
                        line: line_no,
                        reason,
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// Dimension of the first readable entry, without reading the whole log.
    fn stored_dimension(&self) -> Result<Option<usize>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            // an unreachable path has no entries; the append reports why
            Err(e) if e.kind() == std::io::ErrorKind::NotFound || !self.path.exists() => {
                return Ok(None)
            }
            Err(e) => return Err(VellumError::read(&self.path, e)),
        };

        for line in BufReader::new(file).split(b'\n') {
            let line = line.map_err(|e| VellumError::read(&self.path, e))?;
            let raw = line.trim_ascii();
            if raw.is_empty() {
                continue;
            }
            if let LineOutcome::Entry(entry) = LineOutcome::parse(raw) {
                return Ok(Some(entry.dimension()));
            }
        }
        Ok(None)
    }

    /// Recompute every embedding with the current provider and rewrite the log.
    ///
    /// Ids, timestamps, text and tags are preserved. Unreadable lines are
    /// dropped. The new file replaces the old one by rename, so a crash leaves
    /// either the old log or the new one.
    pub fn reembed(&self, batch_size: usize) -> Result<usize> {
        let outcome = self.read_all()?;
        if !outcome.skipped.is_empty() {
            warn!(
                dropped = outcome.skipped.len(),
                "unreadable journal lines will not be carried over"
            );
        }

        let mut entries = outcome.entries;
        let batch_size = batch_size.max(1);
        for batch in entries.chunks_mut(batch_size) {
            let texts: Vec<&str> = batch.iter().map(|e| e.text.as_str()).collect();
            let vectors = self.provider.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(VellumError::Inference(format!(
                    "provider returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (entry, vector) in batch.iter_mut().zip(vectors) {
                entry.embedding = vector;
            }
        }

        let dims: BTreeSet<usize> = entries.iter().map(JournalEntry::dimension).collect();
        if dims.len() > 1 {
            let mut it = dims.into_iter();
            let expected = it.next().unwrap_or_default();
            let got = it.next().unwrap_or_default();
            return Err(VellumError::DimensionMismatch { expected, got });
        }

        self.rewrite(&entries)?;
        info!(
            count = entries.len(),
            model = self.provider.model_id(),
            "journal re-embedded"
        );
        Ok(entries.len())
    }

    fn rewrite(&self, entries: &[JournalEntry]) -> Result<()> {
        let mut body = String::new();
        for entry in entries {
            body.push_str(&serde_json::to_string(entry)?);
            body.push('\n');
        }
        write_atomic(&self.path, body.as_bytes())
    }
}

fn check_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(VellumError::InvalidInput("entry text must not be empty".into()));
    }
    Ok(())
}

/// Whether a non-empty file lacks a trailing newline. Leaves the cursor at the end.
pub(crate) fn ends_without_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Write `contents` to a sibling temp file, fsync it, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| VellumError::write(parent, e))?;
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        VellumError::write(path, e)
    })
}
