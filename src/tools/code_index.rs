//! MCP `code_index` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `code_index` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CodeIndexParams {
    #[schemars(description = "Files or directories to index")]
    pub paths: Vec<String>,

    /// Re-embed every file even when its content hash is unchanged.
    #[schemars(description = "If true, re-index unchanged files too (default: false, incremental)")]
    pub full: Option<bool>,
}
