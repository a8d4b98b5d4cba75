//! MCP `save_to_layer` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `save_to_layer` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SaveToLayerParams {
    /// Target layer name or alias; routing is skipped.
    #[schemars(
        description = "Layer: 'episodic', 'semantic', 'procedural', 'meta', 'identity', or 'working' (aliases accepted)"
    )]
    pub layer: String,

    /// The natural language content to store.
    #[schemars(description = "The content to store")]
    pub content: String,

    /// Same metadata envelope as `remember`.
    #[schemars(
        description = "Optional metadata: context, importance (0-1), emotional_intensity (0-1), tags, related_ids, timestamp, source. Unknown keys are kept under 'custom'."
    )]
    pub metadata: Option<serde_json::Value>,
}
