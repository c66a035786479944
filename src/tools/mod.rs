pub mod code_index;
pub mod code_search;
pub mod journal_add;
pub mod journal_list;
pub mod journal_search;
pub mod journal_stats;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use code_index::CodeIndexParams;
use code_search::CodeSearchParams;
use journal_add::JournalAddParams;
use journal_list::JournalListParams;
use journal_search::JournalSearchParams;
use journal_stats::JournalStatsParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use serde::Serialize;

use vellum::config::VellumConfig;
use vellum::index::{CodeIndex, CodeSearchResponse};
use vellum::journal::responses::{
    AddResponse, ErrorResponse, ListResponse, SearchResponse, StatsResponse,
};
use vellum::journal::{parse_tag_list, Journal};
use vellum::VellumError;

/// The Vellum MCP tool handler. Holds the shared journal, code index and config,
/// and exposes all MCP tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct VellumTools {
    tool_router: ToolRouter<Self>,
    journal: Arc<Journal>,
    index: Arc<CodeIndex>,
    config: Arc<VellumConfig>,
}

/// Render a library error as the JSON error payload tools hand back.
fn error_payload(err: &VellumError) -> String {
    serde_json::to_string(&ErrorResponse::from(err)).unwrap_or_else(|_| err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_router]
impl VellumTools {
    pub fn new(journal: Arc<Journal>, index: Arc<CodeIndex>, config: Arc<VellumConfig>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            journal,
            index,
            config,
        }
    }

    /// Run embedding-bound work off the async runtime, bounded by
    /// `embedding.timeout_ms`. A call that overruns is abandoned, not cancelled.
    async fn bounded<T, F>(&self, work: F) -> Result<T, String>
    where
        F: FnOnce() -> vellum::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let timeout_ms = self.config.embedding.timeout_ms;
        let task = tokio::task::spawn_blocking(work);
        match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
            Ok(joined) => joined
                .map_err(|e| format!("embedding task failed: {e}"))?
                .map_err(|e| error_payload(&e)),
            Err(_) => {
                tracing::warn!(timeout_ms, "embedding call exceeded its deadline");
                Err(error_payload(&VellumError::Inference(format!(
                    "embedding call timed out after {timeout_ms} ms"
                ))))
            }
        }
    }

    /// Add a journal entry.
    #[tool(description = "Add a new entry to the journal. Tags are comma-separated. Returns the entry id and timestamp.")]
    async fn journal_add(
        &self,
        Parameters(params): Parameters<JournalAddParams>,
    ) -> Result<String, String> {
        let tags = parse_tag_list(params.tags.as_deref().unwrap_or(""));
        tracing::info!(text_len = params.text.len(), tags = tags.len(), "journal_add called");
        if params.text.trim().is_empty() {
            return Err(error_payload(&VellumError::InvalidInput(
                "entry text must not be empty".into(),
            )));
        }

        // only the embedding is bounded; once it is back the write always completes
        let journal = Arc::clone(&self.journal);
        let text = params.text.clone();
        let embedding = self.bounded(move || journal.provider().embed(&text)).await?;

        let journal = Arc::clone(&self.journal);
        let text = params.text;
        let entry = tokio::task::spawn_blocking(move || journal.add_embedded(&text, tags, embedding))
            .await
            .map_err(|e| format!("journal write failed: {e}"))?
            .map_err(|e| error_payload(&e))?;

        to_json(&AddResponse::from(&entry))
    }

    /// List recent journal entries.
    #[tool(description = "List recent journal entries, most recent first. Embeddings are omitted.")]
    async fn journal_list(
        &self,
        Parameters(params): Parameters<JournalListParams>,
    ) -> Result<String, String> {
        let limit = params
            .limit
            .unwrap_or(self.config.retrieval.default_list_limit);
        tracing::info!(limit, "journal_list called");

        let journal = Arc::clone(&self.journal);
        let (entries, total) = self.bounded(move || journal.list_with_total(limit)).await?;

        to_json(&ListResponse::new(&entries, total))
    }

    /// Semantic search over the journal.
    #[tool(description = "Search journal entries by semantic similarity to a query. Results are ranked by cosine similarity.")]
    async fn journal_search(
        &self,
        Parameters(params): Parameters<JournalSearchParams>,
    ) -> Result<String, String> {
        let limit = params
            .limit
            .unwrap_or(self.config.retrieval.default_search_limit);
        let threshold = params.threshold.or(self.config.retrieval.min_score);
        tracing::info!(query = %params.query, limit, ?threshold, "journal_search called");

        let journal = Arc::clone(&self.journal);
        let query = params.query.clone();
        let results = self
            .bounded(move || journal.search(&query, limit, threshold))
            .await?;

        let semantic = self.journal.provider().is_semantic();
        to_json(&SearchResponse::new(&params.query, &results, semantic))
    }

    /// Journal statistics.
    #[tool(description = "Get journal statistics: entry count, tag counts, storage path, skipped lines, embedding dimension.")]
    async fn journal_stats(
        &self,
        Parameters(_params): Parameters<JournalStatsParams>,
    ) -> Result<String, String> {
        tracing::info!("journal_stats called");
        let journal = Arc::clone(&self.journal);
        let stats = self.bounded(move || journal.stats()).await?;
        to_json(&StatsResponse::from(stats))
    }

    /// Index source files for code search.
    #[tool(description = "Index files or directories for semantic code search. Incremental by default: unchanged files are skipped.")]
    async fn code_index(
        &self,
        Parameters(params): Parameters<CodeIndexParams>,
    ) -> Result<String, String> {
        if params.paths.is_empty() {
            return Err(error_payload(&VellumError::InvalidInput(
                "at least one path is required".into(),
            )));
        }
        let incremental = !params.full.unwrap_or(false);
        tracing::info!(paths = params.paths.len(), incremental, "code_index called");

        // indexing is a batch job and runs without the per-call deadline
        let index = Arc::clone(&self.index);
        let paths: Vec<PathBuf> = params.paths.into_iter().map(PathBuf::from).collect();
        let result = tokio::task::spawn_blocking(move || index.index(&paths, incremental))
            .await
            .map_err(|e| format!("index task failed: {e}"))?
            .map_err(|e| error_payload(&e))?;

        to_json(&result)
    }

    /// Semantic search over indexed code.
    #[tool(description = "Search indexed code chunks by semantic similarity. Returns file paths, line ranges and chunk text.")]
    async fn code_search(
        &self,
        Parameters(params): Parameters<CodeSearchParams>,
    ) -> Result<String, String> {
        let limit = params
            .limit
            .unwrap_or(self.config.retrieval.default_search_limit);
        tracing::info!(query = %params.query, limit, "code_search called");

        let index = Arc::clone(&self.index);
        let query = params.query.clone();
        let hits = self.bounded(move || index.search(&query, limit)).await?;

        to_json(&CodeSearchResponse::new(&params.query, hits))
    }
}

#[tool_handler]
impl ServerHandler for VellumTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Vellum is a semantic journal. Use journal_add to record entries, \
                 journal_search to find them by meaning, and journal_list for the most \
                 recent ones. code_index and code_search give the same over source files."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
