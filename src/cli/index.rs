use anyhow::{Context, Result};
use std::path::PathBuf;

use super::{open_index, print_json, spinner};
use vellum::config::VellumConfig;

/// Index files for code search. Incremental unless `full` is set.
pub async fn index(config: &VellumConfig, paths: Vec<PathBuf>, full: bool, json: bool) -> Result<()> {
    let index = open_index(config)?;

    let pb = (!json)
        .then(|| spinner(&format!("Indexing {} path(s)", paths.len())))
        .transpose()?;

    let result = tokio::task::spawn_blocking(move || index.index(&paths, !full)).await?;
    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }
    let result = result.context("indexing failed")?;

    if json {
        return print_json(&result);
    }

    println!(
        "Indexed {} file(s), {} chunk(s) into partition {} in {} ms",
        result.files, result.chunks, result.partition, result.duration_ms
    );
    if result.skipped_files > 0 {
        println!("Skipped {} file(s) (unchanged, oversized, or binary)", result.skipped_files);
    }
    Ok(())
}
