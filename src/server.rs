//! MCP server initialization for the stdio transport.
//!
//! Wires the memory service into the tool handler, runs the startup sweep,
//! and owns the two cooperative timers (decay sweep, rate-limiter cleanup).
//! Shutdown stops the timers before the process exits.

use crate::config::StrataConfig;
use crate::limiter::CLEANUP_INTERVAL;
use crate::memory::service::MemoryService;
use crate::tools::StrataTools;
use anyhow::{Context, Result};
use rmcp::ServiceExt;
use std::sync::Arc;
use std::time::Duration;

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: StrataConfig) -> Result<()> {
    tracing::info!("starting Strata MCP server on stdio");

    let service = Arc::new(
        MemoryService::open(&config).context("failed to open layer stores")?,
    );
    tracing::info!(
        data_dir = %config.resolved_data_dir().display(),
        dual_write = config.storage.cache_dir.is_some(),
        "layer stores ready"
    );

    // Initial sweep runs synchronously so startup surfaces its errors.
    if service.decay_enabled() {
        if let Some(summary) = service.sweep_once() {
            tracing::info!(updated = summary.updated, "startup sweep complete");
        }
    }

    let sweeper = spawn_sweep_timer(Arc::clone(&service));
    let cleaner = spawn_cleanup_timer(Arc::clone(&service));

    let tools = StrataTools::new(Arc::clone(&service));
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;

    // Cooperative shutdown: stop the timers, then drop the handles.
    sweeper.abort();
    cleaner.abort();
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Periodic decay sweep. Ticks that arrive while a sweep is still running
/// are dropped by the engine, not queued.
fn spawn_sweep_timer(service: Arc<MemoryService>) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(service.sweep_interval_minutes() * 60);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; the startup sweep covered it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let service = Arc::clone(&service);
            let _ = tokio::task::spawn_blocking(move || service.sweep_once()).await;
        }
    })
}

/// Periodic rate-limiter cleanup; bounds window memory between bursts.
fn spawn_cleanup_timer(service: Arc<MemoryService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            service.limiter_cleanup();
        }
    })
}
