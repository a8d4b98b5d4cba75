use anyhow::Result;

use crate::config::StrataConfig;
use crate::memory::coordinator::DualWriteCoordinator;
use crate::memory::stats::all_layer_stats;
use crate::memory::types::Layer;

/// Display per-layer statistics in the terminal.
pub fn stats(config: &StrataConfig) -> Result<()> {
    let truth_root = config.resolved_data_dir();
    let cache_root = config.resolved_cache_dir();
    let mut coordinator = DualWriteCoordinator::open(&truth_root, cache_root.as_deref())?;

    let all = all_layer_stats(&mut coordinator, &config.decay)?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(72));
    println!(
        "  {:<12} {:>7} {:>9} {:>9} {:>9} {:>10}",
        "layer", "count", "active", "decayed", "immortal", "avg imp"
    );
    for layer in Layer::ALL {
        let s = &all[layer.as_str()];
        println!(
            "  {:<12} {:>7} {:>9} {:>9} {:>9} {:>10}",
            layer.as_str(),
            s.count,
            s.active_count,
            s.decayed_count,
            s.immortal_count,
            s.avg_importance
                .map(|v| format!("{v:.3}"))
                .unwrap_or_else(|| "-".into()),
        );
    }
    println!();
    println!("Durable root:   {}", truth_root.display());
    match cache_root {
        Some(cache) => println!("Cache root:     {} (dual-write on)", cache.display()),
        None => println!("Cache root:     (not configured)"),
    }

    Ok(())
}
