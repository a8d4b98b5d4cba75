//! MCP `remember` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `remember` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RememberParams {
    /// The natural language content to store.
    #[schemars(description = "The content to store")]
    pub content: String,

    /// Target layer. When omitted, the content router picks one.
    #[schemars(
        description = "Optional layer: 'episodic', 'semantic', 'procedural', 'meta', 'identity', or 'working' (aliases accepted). Routed by content when omitted."
    )]
    pub layer: Option<String>,

    /// Recognized keys: context, importance, emotional_intensity, tags,
    /// related_ids, timestamp, source. Unknown keys are kept under `custom`.
    #[schemars(
        description = "Optional metadata: context, importance (0-1), emotional_intensity (0-1), tags, related_ids, timestamp, source. Unknown keys are kept under 'custom'."
    )]
    pub metadata: Option<serde_json::Value>,
}
