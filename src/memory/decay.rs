//! Temporal decay — effective importance, the batched sweeper, and touch.
//!
//! The single authoritative formula lives in [`effective_importance`]. The
//! sweeper materializes it in bounded batches on a cooperative timer tick;
//! recall calls back through [`DecayEngine::touch`] to refresh access
//! bookkeeping. Both paths go through the coordinator so the cache copy
//! stays coherent.

use rusqlite::types::Value as SqlValue;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::DecaySettings;
use crate::memory::coordinator::{BatchOp, DualWriteCoordinator};
use crate::memory::now_secs;
use crate::memory::types::Layer;

/// Effective importance of a record at evaluation time `now`.
///
/// Immortal records (importance at or above the immortal threshold) never
/// decay. A record with no recorded access time is treated as accessed now.
/// Less important records decay faster: the rate scales with `1 − i`.
pub fn effective_importance(
    importance: f64,
    last_accessed: Option<f64>,
    now: f64,
    config: &DecaySettings,
) -> f64 {
    if importance >= config.immortal_threshold {
        return importance;
    }
    let accessed = last_accessed.unwrap_or(now);
    let days = ((now - accessed) / 86_400.0).max(0.0);
    let rate = config.base_rate * (1.0 - importance);
    importance * (-rate * days).exp()
}

/// Result of one sweep pass.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub sequence: u64,
    pub updated: usize,
    pub layer_errors: usize,
    pub duration_ms: u64,
}

/// Counters surfaced through `get_status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepStats {
    pub sweeps_completed: u64,
    pub last_updated: usize,
    pub last_duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_started_at: Option<f64>,
}

pub struct DecayEngine {
    config: DecaySettings,
    sweep_running: AtomicBool,
    stats: Mutex<SweepStats>,
}

impl DecayEngine {
    pub fn new(config: DecaySettings) -> Self {
        Self {
            config,
            sweep_running: AtomicBool::new(false),
            stats: Mutex::new(SweepStats::default()),
        }
    }

    pub fn config(&self) -> &DecaySettings {
        &self.config
    }

    pub fn is_sweep_running(&self) -> bool {
        self.sweep_running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SweepStats {
        // The counter mutex is only held for infallible updates.
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Run one sweep across all layers.
    ///
    /// Returns `None` when a sweep is already in progress (the tick is
    /// dropped, not queued) or when decay is disabled. Per-layer errors are
    /// logged and the sweep continues on the remaining layers.
    pub fn sweep(&self, coordinator: &Mutex<DualWriteCoordinator>) -> Option<SweepSummary> {
        if !self.config.enabled {
            return None;
        }
        if self
            .sweep_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("sweep tick dropped, previous sweep still running");
            return None;
        }

        let started = Instant::now();
        let started_at = now_secs();
        let mut updated = 0usize;
        let mut layer_errors = 0usize;

        for layer in Layer::ALL {
            match self.sweep_layer(coordinator, layer, started_at) {
                Ok(count) => updated += count,
                Err(e) => {
                    layer_errors += 1;
                    warn!(layer = %layer, error = %e, "sweep failed for layer");
                }
            }
        }

        let summary = {
            let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
            stats.sweeps_completed += 1;
            stats.last_updated = updated;
            stats.last_duration_ms = started.elapsed().as_millis() as u64;
            stats.last_started_at = Some(started_at);
            SweepSummary {
                sequence: stats.sweeps_completed,
                updated,
                layer_errors,
                duration_ms: stats.last_duration_ms,
            }
        };

        self.sweep_running.store(false, Ordering::SeqCst);
        info!(
            sequence = summary.sequence,
            updated = summary.updated,
            layer_errors = summary.layer_errors,
            duration_ms = summary.duration_ms,
            "decay sweep finished"
        );
        Some(summary)
    }

    /// Recompute effective importance for up to one batch of mortal rows.
    fn sweep_layer(
        &self,
        coordinator: &Mutex<DualWriteCoordinator>,
        layer: Layer,
        now: f64,
    ) -> Result<usize, crate::error::MemoryError> {
        let mut coordinator = coordinator.lock().map_err(|e| {
            crate::error::MemoryError::Internal(format!("coordinator lock poisoned: {e}"))
        })?;

        // Immortal rows are excluded at selection time; they were pinned to
        // their importance on write.
        let rows = coordinator.query_rows(
            layer,
            "SELECT id, importance, last_accessed FROM memories \
             WHERE importance < ?1 AND last_accessed IS NOT NULL LIMIT ?2",
            &[
                SqlValue::from(self.config.immortal_threshold),
                SqlValue::from(self.config.sweep_batch_size as i64),
            ],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            },
        )?;

        if rows.is_empty() {
            return Ok(0);
        }

        let ops: Vec<BatchOp> = rows
            .iter()
            .map(|(id, importance, last_accessed)| {
                let effective =
                    effective_importance(*importance, *last_accessed, now, &self.config);
                BatchOp {
                    sql: "UPDATE memories SET effective_importance = ?1 WHERE id = ?2".into(),
                    params: vec![SqlValue::from(effective), SqlValue::from(*id)],
                }
            })
            .collect();

        coordinator.apply_batch(layer, &ops)?;
        Ok(ops.len())
    }

    /// Refresh access bookkeeping for recalled records.
    ///
    /// Fire-and-forget from the caller's viewpoint: failures are logged,
    /// never propagated.
    pub fn touch(&self, coordinator: &Mutex<DualWriteCoordinator>, layer: Layer, ids: &[i64]) {
        if ids.is_empty() {
            return;
        }
        let now = now_secs();
        let ops: Vec<BatchOp> = ids
            .iter()
            .map(|id| BatchOp {
                sql: "UPDATE memories SET last_accessed = ?1, access_count = access_count + 1 \
                      WHERE id = ?2"
                    .into(),
                params: vec![SqlValue::from(now), SqlValue::from(*id)],
            })
            .collect();

        match coordinator.lock() {
            Ok(mut coordinator) => {
                if let Err(e) = coordinator.apply_batch(layer, &ops) {
                    warn!(layer = %layer, count = ids.len(), error = %e, "recall touch failed");
                }
            }
            Err(e) => warn!(layer = %layer, error = %e, "recall touch skipped, lock poisoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::NewRecord;

    const DAY: f64 = 86_400.0;

    fn settings() -> DecaySettings {
        DecaySettings::default()
    }

    fn record(importance: f64, age_days: f64, now: f64) -> NewRecord {
        NewRecord {
            timestamp: now - age_days * DAY,
            content: "decays".into(),
            context: String::new(),
            importance,
            emotional_intensity: 0.5,
            metadata_json: None,
            last_accessed: now - age_days * DAY,
            effective_importance: importance,
        }
    }

    #[test]
    fn fresh_record_keeps_its_importance() {
        let cfg = settings();
        let now = 1_700_000_000.0;
        let e = effective_importance(0.5, Some(now), now, &cfg);
        assert!((e - 0.5).abs() < 1e-12);
    }

    #[test]
    fn decay_is_monotonic_in_time() {
        let cfg = settings();
        let accessed = 1_700_000_000.0;
        let mut previous = f64::INFINITY;
        for days in [0.0, 1.0, 7.0, 30.0, 365.0] {
            let e = effective_importance(0.4, Some(accessed), accessed + days * DAY, &cfg);
            assert!(e <= previous);
            previous = e;
        }
        // Strictly decreasing once time has passed.
        let e1 = effective_importance(0.4, Some(accessed), accessed + DAY, &cfg);
        let e2 = effective_importance(0.4, Some(accessed), accessed + 2.0 * DAY, &cfg);
        assert!(e2 < e1);
    }

    #[test]
    fn effective_importance_never_exceeds_importance() {
        let cfg = settings();
        let accessed = 1_700_000_000.0;
        for importance in [0.1, 0.5, 0.89] {
            for days in [0.0, 10.0, 1000.0] {
                let e = effective_importance(importance, Some(accessed), accessed + days * DAY, &cfg);
                assert!(e <= importance);
                assert!(e >= 0.0);
            }
        }
    }

    #[test]
    fn immortal_records_do_not_decay() {
        let cfg = settings();
        let accessed = 1_700_000_000.0;
        let e = effective_importance(0.95, Some(accessed), accessed + 365.0 * DAY, &cfg);
        assert!((e - 0.95).abs() < 1e-12);
        // Exactly at the threshold counts as immortal.
        let e = effective_importance(0.9, Some(accessed), accessed + 365.0 * DAY, &cfg);
        assert!((e - 0.9).abs() < 1e-12);
    }

    #[test]
    fn missing_last_accessed_means_no_decay() {
        let cfg = settings();
        let e = effective_importance(0.3, None, 1_700_000_000.0, &cfg);
        assert!((e - 0.3).abs() < 1e-12);
    }

    #[test]
    fn less_important_records_decay_faster() {
        let cfg = settings();
        let accessed = 1_700_000_000.0;
        let now = accessed + 30.0 * DAY;
        let low = effective_importance(0.2, Some(accessed), now, &cfg) / 0.2;
        let high = effective_importance(0.8, Some(accessed), now, &cfg) / 0.8;
        assert!(low < high, "relative decay should be steeper for low importance");
    }

    #[test]
    fn sweep_materializes_expected_value() {
        let truth = tempfile::tempdir().unwrap();
        let coordinator =
            Mutex::new(DualWriteCoordinator::open(truth.path(), None).unwrap());
        let engine = DecayEngine::new(settings());

        let now = now_secs();
        let id = {
            let mut coord = coordinator.lock().unwrap();
            coord
                .insert_record(Layer::Semantic, &record(0.5, 30.0, now))
                .unwrap()
                .0
        };

        let summary = engine.sweep(&coordinator).unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.layer_errors, 0);

        let stored = coordinator
            .lock()
            .unwrap()
            .get_record(Layer::Semantic, id)
            .unwrap()
            .unwrap();
        let expected = 0.5 * (-0.01 * (1.0 - 0.5) * 30.0f64).exp();
        assert!(
            (stored.effective_importance.unwrap() - expected).abs() < 1e-3,
            "stored {:?}, expected {expected}",
            stored.effective_importance
        );
    }

    #[test]
    fn sweep_skips_immortal_rows() {
        let truth = tempfile::tempdir().unwrap();
        let coordinator =
            Mutex::new(DualWriteCoordinator::open(truth.path(), None).unwrap());
        let engine = DecayEngine::new(settings());

        let now = now_secs();
        let id = {
            let mut coord = coordinator.lock().unwrap();
            coord
                .insert_record(Layer::Identity, &record(0.95, 365.0, now))
                .unwrap()
                .0
        };

        let summary = engine.sweep(&coordinator).unwrap();
        assert_eq!(summary.updated, 0);

        let stored = coordinator
            .lock()
            .unwrap()
            .get_record(Layer::Identity, id)
            .unwrap()
            .unwrap();
        assert!((stored.effective_importance.unwrap() - 0.95).abs() < 1e-12);
    }

    #[test]
    fn sweep_honors_batch_size() {
        let truth = tempfile::tempdir().unwrap();
        let coordinator =
            Mutex::new(DualWriteCoordinator::open(truth.path(), None).unwrap());
        let mut cfg = settings();
        cfg.sweep_batch_size = 3;
        let engine = DecayEngine::new(cfg);

        let now = now_secs();
        {
            let mut coord = coordinator.lock().unwrap();
            for _ in 0..5 {
                coord
                    .insert_record(Layer::Working, &record(0.5, 10.0, now))
                    .unwrap();
            }
        }

        let summary = engine.sweep(&coordinator).unwrap();
        assert_eq!(summary.updated, 3);
    }

    #[test]
    fn concurrent_tick_is_dropped() {
        let truth = tempfile::tempdir().unwrap();
        let coordinator =
            Mutex::new(DualWriteCoordinator::open(truth.path(), None).unwrap());
        let engine = DecayEngine::new(settings());

        engine.sweep_running.store(true, Ordering::SeqCst);
        assert!(engine.sweep(&coordinator).is_none());
        engine.sweep_running.store(false, Ordering::SeqCst);
        assert!(engine.sweep(&coordinator).is_some());
    }

    #[test]
    fn disabled_engine_never_sweeps() {
        let truth = tempfile::tempdir().unwrap();
        let coordinator =
            Mutex::new(DualWriteCoordinator::open(truth.path(), None).unwrap());
        let mut cfg = settings();
        cfg.enabled = false;
        let engine = DecayEngine::new(cfg);
        assert!(engine.sweep(&coordinator).is_none());
    }

    #[test]
    fn touch_updates_access_bookkeeping() {
        let truth = tempfile::tempdir().unwrap();
        let coordinator =
            Mutex::new(DualWriteCoordinator::open(truth.path(), None).unwrap());
        let engine = DecayEngine::new(settings());

        let now = now_secs();
        let id = {
            let mut coord = coordinator.lock().unwrap();
            coord
                .insert_record(Layer::Episodic, &record(0.5, 5.0, now))
                .unwrap()
                .0
        };

        let before = now_secs();
        engine.touch(&coordinator, Layer::Episodic, &[id]);

        let stored = coordinator
            .lock()
            .unwrap()
            .get_record(Layer::Episodic, id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_count, 1);
        assert!(stored.last_accessed.unwrap() >= before - 1.0);
    }

    #[test]
    fn touch_with_no_ids_is_a_no_op() {
        let truth = tempfile::tempdir().unwrap();
        let coordinator =
            Mutex::new(DualWriteCoordinator::open(truth.path(), None).unwrap());
        let engine = DecayEngine::new(settings());
        engine.touch(&coordinator, Layer::Episodic, &[]);
        assert_eq!(engine.stats().sweeps_completed, 0);
    }
}
