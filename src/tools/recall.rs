//! MCP `recall` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `recall` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecallParams {
    /// Substring to search for in content and context.
    #[schemars(description = "Search text, matched as a literal substring")]
    pub query: String,

    /// Restrict the search to one layer; all six are searched when omitted.
    #[schemars(description = "Optional layer to search; all layers when omitted")]
    pub layer: Option<String>,

    /// Maximum results, 1-1000. Defaults to 10.
    #[schemars(description = "Maximum results, 1-1000 (default 10)")]
    pub limit: Option<i64>,

    /// Include records whose effective importance fell below the visibility
    /// threshold.
    #[schemars(description = "Include decayed records (default false)")]
    pub include_decayed: Option<bool>,
}
