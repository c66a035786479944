mod cli;
mod server;
mod tools;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vellum::config::{self, VellumConfig};
use vellum::journal::responses::ErrorResponse;

#[derive(Parser)]
#[command(name = "vellum", version, about = "Semantic journal and code search over local embeddings")]
struct Cli {
    /// Print structured JSON responses instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Config file to load instead of ~/.vellum/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server
    Serve {
        /// Override `server.transport` ("stdio" or "http")
        #[arg(long)]
        transport: Option<String>,
    },
    /// Add a journal entry
    Add {
        text: String,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// List recent journal entries, most recent first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Search the journal by semantic similarity
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        /// Minimum cosine similarity a result must reach
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<f32>,
    },
    /// Show journal statistics
    Stats,
    /// Check the embedding provider, journal and code index
    Doctor,
    /// Recompute every journal embedding with the current provider
    ReEmbed {
        #[arg(long, default_value_t = 32)]
        batch_size: usize,
    },
    /// Index files or directories for code search
    Index {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Re-embed unchanged files too
        #[arg(long)]
        full: bool,
    },
    /// Search indexed code by semantic similarity
    CodeSearch {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Answer one bridge request on stdin/stdout
    EmbedWorker,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the configured embedding model to the cache directory
    Download,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            if json {
                match serde_json::to_string_pretty(&ErrorResponse::from(&e)) {
                    Ok(body) => println!("{body}"),
                    Err(_) => eprintln!("Error: {e:#}"),
                }
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let mut config = VellumConfig::load_from(&config_path)?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for MCP JSON-RPC and bridge responses.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    match cli.command {
        Command::Serve { transport } => {
            if let Some(t) = transport {
                config.server.transport = t;
            }
            server::serve(config).await?;
        }
        Command::Add { text, tags } => cli::add::add(&config, &text, &tags, json).await?,
        Command::List { limit } => cli::list::list(&config, limit, json).await?,
        Command::Search {
            query,
            limit,
            threshold,
        } => cli::search::search(&config, &query, limit, threshold, json).await?,
        Command::Stats => cli::stats::stats(&config, json).await?,
        Command::Doctor => cli::doctor::doctor(&config, &config_path, json).await?,
        Command::ReEmbed { batch_size } => cli::re_embed::re_embed(&config, batch_size, json).await?,
        Command::Index { paths, full } => cli::index::index(&config, paths, full, json).await?,
        Command::CodeSearch { query, limit } => {
            cli::code_search::code_search(&config, &query, limit, json).await?
        }
        Command::EmbedWorker => {
            let code = vellum::bridge::worker::run(&config.embedding)?;
            return Ok(ExitCode::from(code as u8));
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}
