//! MCP `journal_search` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `journal_search` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct JournalSearchParams {
    #[schemars(description = "Natural language search query")]
    pub query: String,

    #[schemars(description = "Maximum number of results. Defaults to 5.")]
    pub limit: Option<usize>,

    /// Cosine similarity floor in `[-1, 1]`. Falls back to `retrieval.min_score`.
    #[schemars(description = "Minimum cosine similarity (-1.0 to 1.0) a result must reach")]
    pub threshold: Option<f32>,
}
