use anyhow::Result;

use super::{blocking, open_journal, preview, print_json};
use vellum::config::VellumConfig;
use vellum::journal::responses::SearchResponse;

/// Run a journal search from the terminal.
pub async fn search(
    config: &VellumConfig,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f32>,
    json: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(config.retrieval.default_search_limit);
    let threshold = threshold.or(config.retrieval.min_score);
    let journal = open_journal(config)?;
    let semantic = journal.provider().is_semantic();

    let query_text = query.to_string();
    let results = blocking(move || journal.search(&query_text, limit, threshold)).await?;
    let response = SearchResponse::new(query, &results, semantic);

    if json {
        return print_json(&response);
    }

    if let Some(ref warning) = response.warning {
        println!("Warning: {warning}\n");
    }

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());
    for (i, result) in results.iter().enumerate() {
        println!(
            "  {}. {} (score: {:.4})",
            i + 1,
            result.entry.id,
            result.score,
        );
        println!("     {}", preview(&result.entry.text, 120));
        println!();
    }

    Ok(())
}
