pub mod envelope;
pub mod get_stats;
pub mod get_status;
pub mod query_layer;
pub mod recall;
pub mod remember;
pub mod save_to_layer;

use get_stats::GetStatsParams;
use get_status::GetStatusParams;
use query_layer::QueryLayerParams;
use recall::RecallParams;
use remember::RememberParams;
use rmcp::handler::server::tool::{Parameters, ToolCallContext, ToolRouter};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_router, ErrorData, ServerHandler};
use save_to_layer::SaveToLayerParams;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::error::MemoryError;
use crate::memory::service::MemoryService;

/// The Strata MCP tool handler. Every handler runs the same pipeline:
/// rate-limit admission, validation and execution on the blocking pool,
/// then a uniform success or error envelope.
#[derive(Clone)]
pub struct StrataTools {
    tool_router: ToolRouter<Self>,
    service: Arc<MemoryService>,
}

impl StrataTools {
    /// Admit, execute, envelope. The final catch converts task failures
    /// (including panics on the blocking pool) into the internal-error shape.
    async fn dispatch<F>(&self, tool: &'static str, op: F) -> Result<String, String>
    where
        F: FnOnce(&MemoryService) -> Result<Value, MemoryError> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let debug = service.debug_enabled();

        if let Err(e) = service.admit(tool) {
            tracing::warn!(tool, code = e.code(), "request denied by rate limiter");
            return Err(envelope::failure(tool, &e, debug));
        }

        let result = tokio::task::spawn_blocking(move || op(&service)).await;
        match result {
            Ok(Ok(data)) => Ok(envelope::success(tool, data)),
            Ok(Err(e)) => {
                tracing::warn!(tool, code = e.code(), error = %e, "operation failed");
                Err(envelope::failure(tool, &e, debug))
            }
            Err(e) => {
                let err = MemoryError::Internal(format!("blocking task failed: {e}"));
                tracing::error!(tool, error = %e, "handler task failed");
                Err(envelope::failure(tool, &err, debug))
            }
        }
    }
}

#[tool_router]
impl StrataTools {
    pub fn new(service: Arc<MemoryService>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service,
        }
    }

    /// Store a memory, routing it to a layer by content when none is given.
    #[tool(description = "Store a memory. Routed across layers (episodic/semantic/procedural/meta/identity/working) by content analysis unless a layer is given.")]
    async fn remember(
        &self,
        Parameters(params): Parameters<RememberParams>,
    ) -> Result<String, String> {
        self.dispatch("remember", move |service| {
            let outcome =
                service.remember(&params.content, params.layer.as_deref(), params.metadata.as_ref())?;
            serde_json::to_value(outcome)
                .map_err(|e| MemoryError::Internal(format!("serialization: {e}")))
        })
        .await
    }

    /// Store a memory in an explicitly named layer.
    #[tool(description = "Store a memory in a specific layer, skipping content routing. Accepts layer aliases (e.g. 'facts' for semantic).")]
    async fn save_to_layer(
        &self,
        Parameters(params): Parameters<SaveToLayerParams>,
    ) -> Result<String, String> {
        self.dispatch("save_to_layer", move |service| {
            let outcome =
                service.save_to_layer(&params.layer, &params.content, params.metadata.as_ref())?;
            serde_json::to_value(outcome)
                .map_err(|e| MemoryError::Internal(format!("serialization: {e}")))
        })
        .await
    }

    /// Search memories by substring, ranked by decayed importance.
    #[tool(description = "Search memories by literal substring across one or all layers. Results are ranked by effective importance, then recency.")]
    async fn recall(
        &self,
        Parameters(params): Parameters<RecallParams>,
    ) -> Result<String, String> {
        self.dispatch("recall", move |service| {
            let results = service.recall(
                &params.query,
                params.layer.as_deref(),
                params.limit,
                params.include_decayed.unwrap_or(false),
            )?;
            serde_json::to_value(results)
                .map_err(|e| MemoryError::Internal(format!("serialization: {e}")))
        })
        .await
    }

    /// Structured query over a single layer.
    #[tool(description = "Query one layer with structured filters (ranges, substring matches), ordering, and a limit.")]
    async fn query_layer(
        &self,
        Parameters(params): Parameters<QueryLayerParams>,
    ) -> Result<String, String> {
        self.dispatch("query_layer", move |service| {
            let options = params.options.unwrap_or_default();
            let results = service.query_layer(
                &params.layer,
                options.filters.as_ref(),
                options.order_by.as_deref(),
                options.limit,
                params.include_decayed.unwrap_or(false),
            )?;
            serde_json::to_value(results)
                .map_err(|e| MemoryError::Internal(format!("serialization: {e}")))
        })
        .await
    }

    /// Report server health and configuration.
    #[tool(description = "Report version, per-layer store health, dual-write configuration, and decay engine status.")]
    async fn get_status(
        &self,
        Parameters(_params): Parameters<GetStatusParams>,
    ) -> Result<String, String> {
        self.dispatch("get_status", |service| service.status()).await
    }

    /// Report per-layer statistics.
    #[tool(description = "Report per-layer record counts, importance averages, and decay statistics.")]
    async fn get_stats(
        &self,
        Parameters(_params): Parameters<GetStatsParams>,
    ) -> Result<String, String> {
        self.dispatch("get_stats", |service| service.stats()).await
    }
}

/// The fixed operation vocabulary. Requests naming anything else get the
/// same error envelope as every other failure, not a protocol-level
/// rejection.
const TOOL_NAMES: [&str; 6] = [
    "remember",
    "save_to_layer",
    "recall",
    "query_layer",
    "get_status",
    "get_stats",
];

impl ServerHandler for StrataTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Strata is a layered memory server. Use remember to save (auto-routed), \
                 save_to_layer to target a layer, recall to search, query_layer for \
                 structured filters, and get_status/get_stats for health and counts."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        if !TOOL_NAMES.contains(&request.name.as_ref()) {
            let name = request.name.to_string();
            tracing::warn!(tool = %name, "unknown tool requested");
            let err = MemoryError::UnknownTool(name.clone());
            let body = envelope::failure(&name, &err, self.service.debug_enabled());
            return Ok(CallToolResult::error(vec![Content::text(body)]));
        }
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: self.tool_router.list_all(),
        })
    }
}
