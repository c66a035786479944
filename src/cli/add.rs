use anyhow::Result;

use super::{blocking, open_journal, print_json};
use vellum::config::VellumConfig;
use vellum::journal::normalize_tags;
use vellum::journal::responses::AddResponse;

/// Add one entry to the journal.
pub async fn add(config: &VellumConfig, text: &str, tags: &[String], json: bool) -> Result<()> {
    let journal = open_journal(config)?;
    let text = text.to_string();
    let tags = normalize_tags(tags);
    let entry = blocking(move || journal.add(&text, tags)).await?;

    if json {
        return print_json(&AddResponse::from(&entry));
    }

    println!("Added entry {}", entry.id);
    println!("  Timestamp:   {}", entry.ts);
    if !entry.tags.is_empty() {
        let tags: Vec<&str> = entry.tags.iter().map(String::as_str).collect();
        println!("  Tags:        {}", tags.join(", "));
    }
    Ok(())
}
