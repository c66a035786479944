//! Structured results handed to the CLI (`--json`) and MCP tools.
//!
//! Every response carries a `status` field; failures use [`ErrorResponse`].
//! Embeddings never leave the library through these types.

use std::collections::BTreeMap;

use serde::Serialize;

use super::types::{JournalEntry, JournalStats, SearchResult};
use crate::error::VellumError;

const SUCCESS: &str = "success";

#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub status: &'static str,
    pub id: String,
    pub timestamp: String,
    pub message: String,
}

impl From<&JournalEntry> for AddResponse {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            status: SUCCESS,
            id: entry.id.clone(),
            timestamp: entry.ts.clone(),
            message: format!("Entry added with id {}", entry.id),
        }
    }
}

/// An entry as shown to callers: no embedding.
#[derive(Debug, Serialize)]
pub struct EntryView {
    pub id: String,
    pub timestamp: String,
    pub text: String,
    pub tags: Vec<String>,
}

impl From<&JournalEntry> for EntryView {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            id: entry.id.clone(),
            timestamp: entry.ts.clone(),
            text: entry.text.clone(),
            tags: entry.tags.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub status: &'static str,
    pub count: usize,
    pub total: usize,
    pub entries: Vec<EntryView>,
}

impl ListResponse {
    pub fn new(entries: &[JournalEntry], total: usize) -> Self {
        Self {
            status: SUCCESS,
            count: entries.len(),
            total,
            entries: entries.iter().map(EntryView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScoredView {
    #[serde(flatten)]
    pub entry: EntryView,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: &'static str,
    pub query: String,
    pub count: usize,
    pub results: Vec<ScoredView>,
    /// Set when the active provider's scores carry no meaning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl SearchResponse {
    pub fn new(query: &str, results: &[SearchResult], semantic: bool) -> Self {
        Self {
            status: SUCCESS,
            query: query.to_string(),
            count: results.len(),
            results: results
                .iter()
                .map(|r| ScoredView {
                    entry: EntryView::from(&r.entry),
                    score: r.score,
                })
                .collect(),
            warning: (!semantic).then(|| {
                "embedding provider is not semantic; ranking does not reflect meaning".to_string()
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub stats: JournalStats,
}

impl From<JournalStats> for StatsResponse {
    fn from(stats: JournalStats) -> Self {
        Self {
            status: SUCCESS,
            stats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
    pub retryable: bool,
}

impl From<&VellumError> for ErrorResponse {
    fn from(err: &VellumError) -> Self {
        Self {
            status: "error",
            error: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<&anyhow::Error> for ErrorResponse {
    fn from(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<VellumError>() {
            Some(e) => Self::from(e),
            None => Self {
                status: "error",
                error: format!("{err:#}"),
                retryable: false,
            },
        }
    }
}

/// Tag frequency map, most common first when rendered by callers.
pub fn tags_by_count(tag_counts: &BTreeMap<String, usize>) -> Vec<(&str, usize)> {
    let mut tags: Vec<(&str, usize)> = tag_counts.iter().map(|(t, c)| (t.as_str(), *c)).collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    tags
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn entry(text: &str) -> JournalEntry {
        JournalEntry {
            id: "id-1".into(),
            ts: "2025-01-01T00:00:00.000000Z".into(),
            text: text.into(),
            tags: BTreeSet::from(["t".to_string()]),
            embedding: vec![1.0, 0.0],
        }
    }

    #[test]
    fn add_response_shape() {
        let value = serde_json::to_value(AddResponse::from(&entry("x"))).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["id"], "id-1");
        assert_eq!(value["timestamp"], "2025-01-01T00:00:00.000000Z");
        assert_eq!(value["message"], "Entry added with id id-1");
    }

    #[test]
    fn list_view_omits_embedding() {
        let value = serde_json::to_value(ListResponse::new(&[entry("x")], 3)).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["total"], 3);
        assert!(value["entries"][0].get("embedding").is_none());
        assert_eq!(value["entries"][0]["tags"][0], "t");
    }

    #[test]
    fn search_warns_only_when_not_semantic() {
        let hits = vec![SearchResult {
            entry: entry("x"),
            score: 0.5,
        }];
        let value = serde_json::to_value(SearchResponse::new("q", &hits, false)).unwrap();
        assert!(value["warning"].is_string());
        assert_eq!(value["results"][0]["score"], 0.5);
        assert_eq!(value["results"][0]["text"], "x");

        let value = serde_json::to_value(SearchResponse::new("q", &hits, true)).unwrap();
        assert!(value.get("warning").is_none());
    }

    #[test]
    fn error_response_carries_retryable() {
        let err = VellumError::BridgeTimeout { timeout_ms: 5 };
        let value = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["retryable"], true);

        let err = anyhow::Error::new(VellumError::InvalidInput("empty".into()));
        let value = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(value["retryable"], false);
        assert_eq!(value["error"], "invalid input: empty");
    }

    #[test]
    fn tags_sorted_by_frequency() {
        let counts = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 3), ("c".to_string(), 1)]);
        assert_eq!(tags_by_count(&counts), vec![("b", 3), ("a", 1), ("c", 1)]);
    }
}
