//! Cosine similarity and top-k ranking over embedding vectors.
//!
//! Linear scan only. The journal and code index are sized for a person or a
//! project, not a vector database.

use serde::Serialize;

use crate::error::{Result, VellumError};

/// A candidate id paired with its similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scored<I> {
    pub id: I,
    pub score: f32,
}

/// Cosine similarity in `[-1, 1]`.
///
/// Returns exactly `0.0` when either vector has zero norm. Accumulates in `f64`
/// so long vectors with large components neither overflow nor drift outside
/// the valid range.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(VellumError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(sim.clamp(-1.0, 1.0) as f32)
}

/// Rank `candidates` against `query`, keeping the best `k`.
///
/// Ordering is descending by score; equal scores keep candidate order. Candidates
/// scoring below `threshold` are dropped before the cut. `k == 0` yields nothing.
pub fn top_k<'a, I, C>(
    query: &[f32],
    candidates: C,
    k: usize,
    threshold: Option<f32>,
) -> Result<Vec<Scored<I>>>
where
    C: IntoIterator<Item = (I, &'a [f32])>,
{
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut scored = Vec::new();
    for (id, vector) in candidates {
        let score = cosine_similarity(query, vector)?;
        if threshold.is_some_and(|t| score < t) {
            continue;
        }
        scored.push(Scored { id, score });
    }

    // sort_by is stable: ties stay in insertion order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    Ok(scored)
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
