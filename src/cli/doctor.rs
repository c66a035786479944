//! CLI `doctor` command: check the provider, journal and index, and print a health report.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use super::{blocking, open_index, open_journal, print_json};
use vellum::config::VellumConfig;
use vellum::journal::JournalStats;

#[derive(Debug, Serialize)]
struct ModelFiles {
    dir: String,
    model_onnx: bool,
    tokenizer_json: bool,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    status: &'static str,
    config_path: String,
    config_found: bool,
    provider: String,
    model_id: String,
    semantic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_files: Option<ModelFiles>,
    probe_dimension: Option<usize>,
    journal: JournalStats,
    index_model: Option<String>,
    index_dimension: Option<usize>,
    index_chunks: usize,
    issues: Vec<String>,
}

/// Run diagnostics and print a health report.
pub async fn doctor(config: &VellumConfig, config_path: &Path, json: bool) -> Result<()> {
    let mut issues = Vec::new();

    let journal = open_journal(config)?;
    let index = open_index(config)?;
    let model_id = journal.provider().model_id().to_string();
    let semantic = journal.provider().is_semantic();

    let model_files = (config.embedding.provider == "local").then(|| {
        let dir = config.embedding.model_dir();
        ModelFiles {
            dir: dir.display().to_string(),
            model_onnx: dir.join("model.onnx").exists(),
            tokenizer_json: dir.join("tokenizer.json").exists(),
        }
    });
    if let Some(ref files) = model_files {
        if !files.model_onnx || !files.tokenizer_json {
            issues.push("model files missing; run `vellum model download`".to_string());
        }
    }

    let probe = {
        let journal = journal.clone();
        blocking(move || journal.provider().embed("vellum doctor probe")).await
    };
    let probe_dimension = match probe {
        Ok(v) => Some(v.len()),
        Err(e) => {
            issues.push(format!("embedding probe failed: {e:#}"));
            None
        }
    };
    if !semantic {
        issues.push("embedding provider is not semantic; search ranking is arbitrary".to_string());
    }

    let stats = {
        let journal = journal.clone();
        blocking(move || journal.stats()).await?
    };
    if stats.skipped_lines > 0 {
        issues.push(format!(
            "{} unreadable journal line(s); `vellum re-embed` rewrites the log without them",
            stats.skipped_lines
        ));
    }
    if let (Some(stored), Some(probe)) = (stats.dimension, probe_dimension) {
        if stored != probe {
            issues.push(format!(
                "journal dimension {stored} differs from provider dimension {probe}; run `vellum re-embed`"
            ));
        }
    }

    let manifest = index.manifest()?;
    if let Some(ref stored) = manifest.model {
        if stored != &model_id {
            issues.push(format!(
                "code index built with {stored}, provider is {model_id}; run `vellum index --full`"
            ));
        }
    }

    let report = DoctorReport {
        status: "success",
        config_path: config_path.display().to_string(),
        config_found: config_path.exists(),
        provider: config.embedding.provider.clone(),
        model_id,
        semantic,
        model_files,
        probe_dimension,
        journal: stats,
        index_model: manifest.model,
        index_dimension: manifest.dimension,
        index_chunks: manifest.total_chunks,
        issues,
    };

    if json {
        return print_json(&report);
    }

    println!("Vellum Health Report");
    println!("====================");
    println!();
    println!(
        "Config:            {}{}",
        report.config_path,
        if report.config_found { "" } else { " (not found, using defaults)" }
    );
    println!();
    println!("Embedding:");
    println!("  Provider:        {}", report.provider);
    println!("  Model:           {}", report.model_id);
    println!("  Semantic:        {}", report.semantic);
    if let Some(ref files) = report.model_files {
        println!("  Model dir:       {}", files.dir);
        println!("  model.onnx:      {}", if files.model_onnx { "present" } else { "MISSING" });
        println!("  tokenizer.json:  {}", if files.tokenizer_json { "present" } else { "MISSING" });
    }
    match report.probe_dimension {
        Some(d) => println!("  Probe:           OK ({d} dims)"),
        None => println!("  Probe:           FAILED"),
    }
    println!();
    println!("Journal:");
    println!("  Path:            {}", report.journal.storage_path);
    println!("  Entries:         {}", report.journal.total_entries);
    println!("  Skipped lines:   {}", report.journal.skipped_lines);
    println!(
        "  Dimension:       {}",
        report.journal.dimension.map_or("(empty)".to_string(), |d| d.to_string())
    );
    println!();
    println!("Code index:");
    println!("  Model:           {}", report.index_model.as_deref().unwrap_or("(not built)"));
    println!("  Chunks:          {}", report.index_chunks);
    println!();

    if report.issues.is_empty() {
        println!("No issues found.");
    } else {
        println!("Issues:");
        for issue in &report.issues {
            println!("  - {issue}");
        }
    }

    Ok(())
}
