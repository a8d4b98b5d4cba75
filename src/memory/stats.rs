use rusqlite::types::Value as SqlValue;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::DecaySettings;
use crate::error::MemoryError;
use crate::memory::coordinator::DualWriteCoordinator;
use crate::memory::types::Layer;

/// Aggregates for one layer, as reported by `get_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct LayerStats {
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_importance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_emotional_intensity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_recent: Option<f64>,
    pub immortal_count: i64,
    pub active_count: i64,
    pub decayed_count: i64,
}

/// Compute aggregates for a single layer through the coordinator's read path.
pub fn layer_stats(
    coordinator: &mut DualWriteCoordinator,
    layer: Layer,
    decay: &DecaySettings,
) -> Result<LayerStats, MemoryError> {
    let rows = coordinator.query_rows(
        layer,
        "SELECT COUNT(*), AVG(importance), AVG(emotional_intensity), MAX(timestamp), \
         SUM(CASE WHEN importance >= ?1 THEN 1 ELSE 0 END), \
         SUM(CASE WHEN effective_importance IS NOT NULL AND effective_importance < ?2 \
             THEN 1 ELSE 0 END), \
         SUM(CASE WHEN effective_importance IS NULL OR effective_importance >= ?2 \
             THEN 1 ELSE 0 END) \
         FROM memories",
        &[
            SqlValue::from(decay.immortal_threshold),
            SqlValue::from(decay.threshold),
        ],
        |row| {
            Ok(LayerStats {
                count: row.get(0)?,
                avg_importance: row.get(1)?,
                avg_emotional_intensity: row.get(2)?,
                most_recent: row.get(3)?,
                immortal_count: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                decayed_count: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
                active_count: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
            })
        },
    )?;
    rows.into_iter()
        .next()
        .ok_or_else(|| MemoryError::Internal("aggregate query returned no row".into()))
}

/// Aggregates for every layer, keyed by layer name.
pub fn all_layer_stats(
    coordinator: &mut DualWriteCoordinator,
    decay: &DecaySettings,
) -> Result<BTreeMap<&'static str, LayerStats>, MemoryError> {
    let mut map = BTreeMap::new();
    for layer in Layer::ALL {
        map.insert(layer.as_str(), layer_stats(coordinator, layer, decay)?);
    }
    Ok(map)
}
