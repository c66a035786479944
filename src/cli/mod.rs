pub mod add;
pub mod code_search;
pub mod doctor;
pub mod index;
pub mod list;
pub mod re_embed;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use vellum::config::{EmbeddingConfig, VellumConfig};
use vellum::embedding::{self, EmbeddingProvider};
use vellum::index::CodeIndex;
use vellum::journal::Journal;

/// Build the configured provider, shared.
pub fn provider(config: &VellumConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider =
        embedding::create_provider(&config.embedding).context("failed to create embedding provider")?;
    Ok(Arc::from(provider))
}

pub fn open_journal(config: &VellumConfig) -> Result<Arc<Journal>> {
    Ok(Arc::new(Journal::open(
        config.resolved_journal_path(),
        provider(config)?,
    )))
}

pub fn open_index(config: &VellumConfig) -> Result<Arc<CodeIndex>> {
    Ok(Arc::new(CodeIndex::open(
        config.resolved_index_dir(),
        provider(config)?,
        config.indexing.clone(),
    )))
}

/// Run library work (embedding, file I/O) on the blocking pool.
pub async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> vellum::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// First `max` characters of `text` on one line, with an ellipsis when cut.
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

pub fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("  {spinner} {msg} ({elapsed})")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(pb)
}

/// Hugging Face download URL of a file in the configured model's repository.
fn hf_url(model: &str, file: &str) -> String {
    format!("https://huggingface.co/{model}/resolve/main/{file}")
}

/// Download the ONNX embedding model and tokenizer to the cache directory.
pub async fn model_download(config: &EmbeddingConfig) -> Result<()> {
    let model_dir = config.model_dir();
    std::fs::create_dir_all(&model_dir)
        .with_context(|| format!("failed to create cache dir: {}", model_dir.display()))?;

    let model_path = model_dir.join("model.onnx");
    let tokenizer_path = model_dir.join("tokenizer.json");

    if model_path.exists() {
        println!("Model already exists at {}", model_path.display());
    } else {
        println!("Downloading {} model.onnx...", config.model);
        download_file(&hf_url(&config.model, "onnx/model.onnx"), &model_path).await?;
        println!("Model saved to {}", model_path.display());
    }

    if tokenizer_path.exists() {
        println!("Tokenizer already exists at {}", tokenizer_path.display());
    } else {
        println!("Downloading tokenizer.json...");
        download_file(&hf_url(&config.model, "tokenizer.json"), &tokenizer_path).await?;
        println!("Tokenizer saved to {}", tokenizer_path.display());
    }

    println!("Model download complete. Ready for use.");
    Ok(())
}

/// Download a file from a URL with progress bar. Uses atomic write (tmp + rename).
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download failed with HTTP {} for {url}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")?
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    while let Some(chunk) = response.chunk().await.context("error reading response")? {
        file.write_all(&chunk)
            .await
            .context("error writing to file")?;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    pb.finish_and_clear();
    Ok(())
}
