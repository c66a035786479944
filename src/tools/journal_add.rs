//! MCP `journal_add` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `journal_add` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct JournalAddParams {
    #[schemars(description = "The entry text (required, must not be blank)")]
    pub text: String,

    /// Comma-separated, e.g. `"work, ideas"`. Blank tags are dropped.
    #[schemars(description = "Comma-separated tags, e.g. 'work, ideas'")]
    pub tags: Option<String>,
}
