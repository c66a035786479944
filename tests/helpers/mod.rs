#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use vellum::config::IndexingConfig;
use vellum::embedding::hash::HashEmbeddingProvider;
use vellum::embedding::EmbeddingProvider;
use vellum::index::CodeIndex;
use vellum::journal::Journal;
use vellum::{Result, VellumError};

/// Deterministic offline provider of the given dimension.
pub fn hash_provider(dim: usize) -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashEmbeddingProvider::new(dim).unwrap())
}

/// A fresh journal in its own temp directory. Keep the `TempDir` alive.
pub fn temp_journal(dim: usize) -> (TempDir, Journal) {
    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::open(dir.path().join("journal.jsonl"), hash_provider(dim));
    (dir, journal)
}

pub fn journal_at(path: &Path, provider: Arc<dyn EmbeddingProvider>) -> Journal {
    Journal::open(path, provider)
}

/// A fresh code index with small chunks, in its own temp directory.
pub fn temp_index(dim: usize) -> (TempDir, CodeIndex) {
    let dir = tempfile::tempdir().unwrap();
    let config = IndexingConfig {
        chunk_lines: 4,
        chunk_overlap: 1,
        ..IndexingConfig::default()
    };
    let index = CodeIndex::open(dir.path().join("index"), hash_provider(dim), config);
    (dir, index)
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Random finite floats spanning many magnitudes and both signs.
pub fn random_vector(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    (0..dim)
        .map(|_| loop {
            let x = f32::from_bits(rng.random::<u32>());
            if x.is_finite() {
                break x;
            }
        })
        .collect()
}

/// Random vector with components in `[-1, 1)`.
pub fn random_unit_range(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rng.random_range(-1.0f32..1.0)).collect()
}

/// Provider answering from a fixed text -> vector table, for controlled ranking.
pub struct TableProvider {
    table: HashMap<String, Vec<f32>>,
    dim: usize,
}

impl TableProvider {
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        let dim = entries.first().map_or(0, |(_, v)| v.len());
        Self {
            table: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            dim,
        }
    }
}

impl EmbeddingProvider for TableProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| {
                self.table
                    .get(*t)
                    .cloned()
                    .ok_or_else(|| VellumError::Inference(format!("no vector for {t:?}")))
            })
            .collect()
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dim)
    }

    fn model_id(&self) -> &str {
        "table"
    }

    fn is_semantic(&self) -> bool {
        true
    }
}
