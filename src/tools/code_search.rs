use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CodeSearchParams {
    #[schemars(description = "Natural language or code query")]
    pub query: String,

    #[schemars(description = "Maximum number of chunks to return. Defaults to 5.")]
    pub limit: Option<usize>,
}
