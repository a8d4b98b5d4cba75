//! CLI `doctor` command — open every layer and print a health report.

use anyhow::{Context, Result};

use crate::config::StrataConfig;
use crate::memory::coordinator::DualWriteCoordinator;
use crate::memory::types::Layer;

/// Run store diagnostics and print a health report.
pub fn doctor(config: &StrataConfig) -> Result<()> {
    let truth_root = config.resolved_data_dir();
    let cache_root = config.resolved_cache_dir();

    if !truth_root.exists() {
        println!("Durable root: not found at {}", truth_root.display());
        println!("Run `strata serve` to initialize.");
        return Ok(());
    }

    let coordinator = DualWriteCoordinator::open(&truth_root, cache_root.as_deref())
        .context("failed to open layer stores (a file may be corrupt)")?;
    let report = coordinator.health();

    println!("Strata Health Report");
    println!("====================");
    println!();
    println!("Durable root:      {}", truth_root.display());
    match &cache_root {
        Some(cache) => println!("Cache root:        {}", cache.display()),
        None => println!("Cache root:        (not configured)"),
    }
    println!("Overall:           {}", report.overall);
    println!();
    println!("Layers:");
    for layer in Layer::ALL {
        let health = &report.layers[layer.as_str()];
        let size = std::fs::metadata(truth_root.join(layer.file_name()))
            .map(|m| m.len())
            .unwrap_or(0);
        println!(
            "  {:<12} {:<10} {:>8} rows  {:>10}",
            layer.as_str(),
            health.status,
            health.count.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
            format_bytes(size),
        );
    }

    if !report.degraded_layers.is_empty() {
        println!();
        println!("Degraded cache layers: {}", report.degraded_layers.join(", "));
        println!("Reads fall back to the durable copy until the cache reseeds.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
