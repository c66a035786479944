use anyhow::Result;

use super::{blocking, open_index, preview, print_json};
use vellum::config::VellumConfig;
use vellum::index::CodeSearchResponse;

/// Search the code index from the terminal.
pub async fn code_search(
    config: &VellumConfig,
    query: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(config.retrieval.default_search_limit);
    let index = open_index(config)?;

    let query_text = query.to_string();
    let hits = blocking(move || index.search(&query_text, limit)).await?;

    if json {
        return print_json(&CodeSearchResponse::new(query, hits));
    }

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!(
            "  {}. {}:{}-{} (score: {:.4})",
            i + 1,
            hit.path,
            hit.start_line,
            hit.end_line,
            hit.score
        );
        println!("     {}", preview(&hit.text, 160));
        println!();
    }
    Ok(())
}
