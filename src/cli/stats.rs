use anyhow::Result;

use super::{blocking, open_journal, print_json};
use vellum::config::VellumConfig;
use vellum::journal::responses::{tags_by_count, StatsResponse};

/// Display journal statistics in the terminal.
pub async fn stats(config: &VellumConfig, json: bool) -> Result<()> {
    let journal = open_journal(config)?;
    let stats = blocking(move || journal.stats()).await?;

    if json {
        return print_json(&StatsResponse::from(stats));
    }

    println!("Journal Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total entries:       {}", stats.total_entries);
    println!("  Skipped lines:       {}", stats.skipped_lines);
    match stats.dimension {
        Some(d) => println!("  Dimension:           {d}"),
        None => println!("  Dimension:           (no entries)"),
    }
    println!("  File size:           {} bytes", stats.file_size_bytes);
    println!("  Storage path:        {}", stats.storage_path);
    if let Some(ref oldest) = stats.oldest_entry {
        println!("  Oldest entry:        {oldest}");
    }
    if let Some(ref newest) = stats.newest_entry {
        println!("  Newest entry:        {newest}");
    }
    println!();

    if !stats.tag_counts.is_empty() {
        println!("By Tag:");
        for (tag, count) in tags_by_count(&stats.tag_counts) {
            println!("  {:<20} {}", tag, count);
        }
    }

    Ok(())
}
