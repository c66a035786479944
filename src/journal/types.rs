//! Journal record types and the tolerant line parser.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One immutable journal record, stored as a single JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// UUID v7, so ids sort by creation time.
    pub id: String,
    /// RFC 3339 UTC with microseconds, e.g. `2025-03-01T12:00:00.123456Z`.
    pub ts: String,
    pub text: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(with = "crate::codec::serde_hex")]
    pub embedding: Vec<f32>,
}

impl JournalEntry {
    /// Create a new entry stamped with a fresh id and the current time.
    pub fn new(text: impl Into<String>, tags: BTreeSet<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            ts: now_timestamp(),
            text: text.into(),
            tags,
            embedding,
        }
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// Current UTC time in the journal's timestamp format.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Trim tags and drop the empty ones.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse a comma-separated tag list such as `"work, ideas,,"`.
pub fn parse_tag_list(raw: &str) -> BTreeSet<String> {
    normalize_tags(raw.split(','))
}

/// A search hit. Never persisted.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: JournalEntry,
    pub score: f32,
}

/// Aggregate view of a journal file.
#[derive(Debug, Clone, Serialize)]
pub struct JournalStats {
    pub total_entries: usize,
    pub tag_counts: BTreeMap<String, usize>,
    pub storage_path: String,
    pub skipped_lines: usize,
    /// Embedding dimension of the stored entries, if any.
    pub dimension: Option<usize>,
    pub oldest_entry: Option<String>,
    pub newest_entry: Option<String>,
    pub file_size_bytes: u64,
}

/// Result of parsing one raw line.
#[derive(Debug)]
pub enum LineOutcome {
    Entry(JournalEntry),
    Skip(String),
}

impl LineOutcome {
    /// Parse one line independently of its neighbours. Blank lines are not
    /// passed here.
    pub fn parse(raw: &[u8]) -> Self {
        let line = match std::str::from_utf8(raw) {
            Ok(l) => l,
            Err(e) => return Self::Skip(format!("invalid UTF-8: {e}")),
        };
        match serde_json::from_str::<JournalEntry>(line) {
            Ok(entry) if entry.embedding.is_empty() => Self::Skip("empty embedding".into()),
            Ok(entry) => Self::Entry(entry),
            Err(e) => Self::Skip(e.to_string()),
        }
    }
}

/// A line that was dropped while reading.
#[derive(Debug, Clone)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

/// Everything a full read of the log produced.
#[derive(Debug, Default)]
pub struct ReadOutcome {
    pub entries: Vec<JournalEntry>,
    pub skipped: Vec<SkippedLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JournalEntry {
        JournalEntry {
            id: "0190a5b2-0000-7000-8000-000000000000".into(),
            ts: "2025-03-01T12:00:00.000001Z".into(),
            text: "hello".into(),
            tags: normalize_tags(["b", "a"]),
            embedding: vec![1.0, -2.0],
        }
    }

    #[test]
    fn serializes_to_one_json_line() {
        let line = serde_json::to_string(&sample()).unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(
            line,
            r#"{"id":"0190a5b2-0000-7000-8000-000000000000","ts":"2025-03-01T12:00:00.000001Z","text":"hello","tags":["a","b"],"embedding":"0000803f000000c0"}"#
        );
    }

    #[test]
    fn parse_accepts_valid_line() {
        let line = serde_json::to_vec(&sample()).unwrap();
        match LineOutcome::parse(&line) {
            LineOutcome::Entry(e) => assert_eq!(e, sample()),
            LineOutcome::Skip(reason) => panic!("unexpected skip: {reason}"),
        }
    }

    #[test]
    fn parse_skips_truncated_line() {
        let line = serde_json::to_vec(&sample()).unwrap();
        assert!(matches!(
            LineOutcome::parse(&line[..line.len() / 2]),
            LineOutcome::Skip(_)
        ));
    }

    #[test]
    fn parse_skips_bad_embedding() {
        let raw = br#"{"id":"x","ts":"t","text":"hi","tags":[],"embedding":"abc"}"#;
        assert!(matches!(LineOutcome::parse(raw), LineOutcome::Skip(_)));
        let raw = br#"{"id":"x","ts":"t","text":"hi","tags":[],"embedding":""}"#;
        assert!(matches!(LineOutcome::parse(raw), LineOutcome::Skip(_)));
    }

    #[test]
    fn parse_skips_invalid_utf8() {
        assert!(matches!(
            LineOutcome::parse(&[0xff, 0xfe, b'{']),
            LineOutcome::Skip(ref r) if r.contains("UTF-8")
        ));
    }

    #[test]
    fn missing_tags_default_to_empty() {
        let raw = br#"{"id":"x","ts":"t","text":"hi","embedding":"0000803f"}"#;
        match LineOutcome::parse(raw) {
            LineOutcome::Entry(e) => assert!(e.tags.is_empty()),
            LineOutcome::Skip(reason) => panic!("unexpected skip: {reason}"),
        }
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = parse_tag_list(" work, ideas ,,work,  ");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["ideas", "work"]);
    }

    #[test]
    fn timestamp_has_micros_and_z() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        let frac = ts.split('.').nth(1).unwrap();
        assert_eq!(frac.len(), "123456Z".len());
    }

    #[test]
    fn new_entries_get_v7_ids() {
        let e = JournalEntry::new("x", BTreeSet::new(), vec![0.0]);
        let id = uuid::Uuid::parse_str(&e.id).unwrap();
        assert_eq!(id.get_version_num(), 7);
    }
}
