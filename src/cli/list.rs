use anyhow::Result;

use super::{blocking, open_journal, preview, print_json};
use vellum::config::VellumConfig;
use vellum::journal::responses::ListResponse;

/// Print the most recent journal entries.
pub async fn list(config: &VellumConfig, limit: Option<usize>, json: bool) -> Result<()> {
    let limit = limit.unwrap_or(config.retrieval.default_list_limit);
    let journal = open_journal(config)?;

    let (entries, total) = blocking(move || journal.list_with_total(limit)).await?;

    if json {
        return print_json(&ListResponse::new(&entries, total));
    }

    if entries.is_empty() {
        println!("Journal is empty.");
        return Ok(());
    }

    println!("Showing {} of {} entries (most recent first)\n", entries.len(), total);
    for entry in &entries {
        let tags: Vec<&str> = entry.tags.iter().map(String::as_str).collect();
        println!("  {}  {}", entry.ts, entry.id);
        if !tags.is_empty() {
            println!("     [{}]", tags.join(", "));
        }
        println!("     {}", preview(&entry.text, 120));
        println!();
    }
    Ok(())
}
