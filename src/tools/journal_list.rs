use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct JournalListParams {
    #[schemars(description = "Maximum number of entries to return, most recent first. Defaults to 10.")]
    pub limit: Option<usize>,
}
