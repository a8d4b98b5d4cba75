//! MCP `query_layer` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured query options: filters, ordering, limit.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct QueryOptions {
    /// Recognized keys: id, importance_min/max, emotional_intensity_min/max,
    /// timestamp_after/before, content_contains, context_contains,
    /// effective_importance_min/max.
    #[schemars(
        description = "Filter map: id, importance_min/max, emotional_intensity_min/max, timestamp_after/before, content_contains, context_contains, effective_importance_min/max"
    )]
    pub filters: Option<serde_json::Value>,

    /// `"<column> [asc|desc]"` over id, timestamp, content, event, context,
    /// emotional_intensity, or importance. Falls back to `timestamp desc`.
    #[schemars(description = "Ordering, e.g. 'importance desc' (default 'timestamp desc')")]
    pub order_by: Option<String>,

    /// Maximum results, 1-1000. Defaults to 10.
    #[schemars(description = "Maximum results, 1-1000 (default 10)")]
    pub limit: Option<i64>,
}

/// Parameters for the `query_layer` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryLayerParams {
    /// Layer to scan.
    #[schemars(description = "Layer to query (canonical name or alias)")]
    pub layer: String,

    /// Filters, ordering, and limit.
    #[schemars(description = "Query options: filters, order_by, limit")]
    pub options: Option<QueryOptions>,

    /// Include records below the visibility threshold.
    #[schemars(description = "Include decayed records (default false)")]
    pub include_decayed: Option<bool>,
}
