//! CLI `re-embed` command, regenerate all journal embeddings with the current provider.

use anyhow::{Context, Result};

use super::{open_journal, print_json, spinner};
use vellum::config::VellumConfig;

#[derive(serde::Serialize)]
struct ReEmbedResponse {
    status: &'static str,
    count: usize,
    model: String,
}

/// Re-embed every journal entry with the configured provider and rewrite the log.
pub async fn re_embed(config: &VellumConfig, batch_size: usize, json: bool) -> Result<()> {
    let journal = open_journal(config)?;
    let model = journal.provider().model_id().to_string();

    let pb = (!json)
        .then(|| spinner(&format!("Re-embedding journal with '{model}'")))
        .transpose()?;

    let result = tokio::task::spawn_blocking(move || journal.reembed(batch_size)).await?;
    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }
    let count = result.context("re-embedding failed")?;

    if json {
        return print_json(&ReEmbedResponse {
            status: "success",
            count,
            model,
        });
    }

    if count == 0 {
        println!("No journal entries to re-embed.");
    } else {
        println!("Re-embedded {count} entries with model '{model}'.");
    }
    Ok(())
}
