//! Line-window chunking of source files.

use tracing::debug;

/// A contiguous run of lines from one file.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeChunk {
    /// Position of this chunk within its file.
    pub chunk_index: usize,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub text: String,
}

/// Split `content` into windows of `window` lines, each starting `window - overlap`
/// lines after the previous one. Whitespace-only windows are dropped.
///
/// An overlap of `window` or more is clamped so that every window advances by at
/// least one line.
pub fn chunk_lines(content: &str, window: usize, overlap: usize) -> Vec<CodeChunk> {
    let lines: Vec<&str> = content.lines().collect();
    let window = window.max(1);
    let step = window.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < lines.len() {
        let end = (start + window).min(lines.len());
        let text = lines[start..end].join("\n");
        if !text.trim().is_empty() {
            chunks.push(CodeChunk {
                chunk_index: chunks.len(),
                start_line: start + 1,
                end_line: end,
                text,
            });
        }
        if end == lines.len() {
            break;
        }
        start += step;
    }

    debug!(lines = lines.len(), chunks = chunks.len(), window, overlap, "chunked file");
    chunks
}
