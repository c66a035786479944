//! MCP server initialization for stdio and streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that wire up the
//! journal, code index, embedding provider, and MCP tool handler into a running
//! server.

use std::sync::Arc;

use anyhow::Result;
use rmcp::ServiceExt;

use crate::tools::VellumTools;
use vellum::config::VellumConfig;
use vellum::embedding::{self, EmbeddingProvider};
use vellum::index::CodeIndex;
use vellum::journal::Journal;

type SharedState = (Arc<Journal>, Arc<CodeIndex>, Arc<VellumConfig>);

/// Shared setup: create the embedding provider, open the journal and index,
/// and warn when the index was built with another model.
fn setup_shared_state(config: VellumConfig) -> Result<SharedState> {
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    tracing::info!(
        provider = %config.embedding.provider,
        model = provider.model_id(),
        semantic = provider.is_semantic(),
        "embedding provider ready"
    );

    let journal_path = config.resolved_journal_path();
    let journal = Journal::open(&journal_path, Arc::clone(&provider));
    tracing::info!(journal = %journal_path.display(), "journal ready");

    let index = CodeIndex::open(
        config.resolved_index_dir(),
        Arc::clone(&provider),
        config.indexing.clone(),
    );
    if let Ok(manifest) = index.manifest() {
        if let Some(stored) = manifest.model.as_deref() {
            if stored != provider.model_id() {
                tracing::warn!(
                    stored,
                    configured = provider.model_id(),
                    "code index was built with another model, run `vellum index --full`"
                );
            }
        }
    }

    Ok((Arc::new(journal), Arc::new(index), Arc::new(config)))
}

/// Start the MCP server on the configured transport.
pub async fn serve(config: VellumConfig) -> Result<()> {
    match config.server.transport.as_str() {
        "stdio" => serve_stdio(config).await,
        "http" => serve_http(config).await,
        other => anyhow::bail!("unknown transport: {other}. Supported: stdio, http"),
    }
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: VellumConfig) -> Result<()> {
    tracing::info!("starting Vellum MCP server on stdio");

    let (journal, index, config) = setup_shared_state(config)?;

    let tools = VellumTools::new(journal, index, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP transport.
pub async fn serve_http(config: VellumConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting Vellum MCP server on HTTP");

    let (journal, index, config) = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(VellumTools::new(journal.clone(), index.clone(), config.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
