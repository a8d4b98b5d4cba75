//! The operation surface — one owned value threaded through the dispatcher.
//!
//! `MemoryService` binds the validator, router, coordinator, decay engine,
//! and rate limiter into the six operations the tool layer exposes. All
//! methods are synchronous; the tool layer runs them on the blocking pool.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Mutex;

use crate::config::StrataConfig;
use crate::error::MemoryError;
use crate::limiter::RateLimiter;
use crate::memory::coordinator::DualWriteCoordinator;
use crate::memory::decay::{DecayEngine, SweepSummary};
use crate::memory::now_secs;
use crate::memory::query::{self, QueryFilters};
use crate::memory::router::{ContentRouter, RouteDecision};
use crate::memory::stats;
use crate::memory::types::{Layer, MemoryRecord, NewRecord};
use crate::memory::validate;

/// Result of `remember` / `save_to_layer`.
#[derive(Debug, Serialize)]
pub struct SaveOutcome {
    pub layer: &'static str,
    pub id: i64,
    pub timestamp: f64,
    /// Whether the record was mirrored into the cache store.
    pub dual_write: bool,
}

/// A record tagged with its source layer, as returned by reads.
#[derive(Debug, Serialize)]
pub struct RecalledRecord {
    pub layer: &'static str,
    #[serde(flatten)]
    pub record: MemoryRecord,
}

pub struct MemoryService {
    coordinator: Mutex<DualWriteCoordinator>,
    router: ContentRouter,
    decay: DecayEngine,
    limiter: Mutex<RateLimiter>,
    debug: bool,
}

impl MemoryService {
    fn coordinator(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, DualWriteCoordinator>, MemoryError> {
        self.coordinator
            .lock()
            .map_err(|e| MemoryError::Internal(format!("coordinator lock poisoned: {e}")))
    }

    /// Open all layer stores and assemble the engine.
    pub fn open(config: &StrataConfig) -> Result<Self, MemoryError> {
        let truth_root = config.resolved_data_dir();
        let cache_root = config.resolved_cache_dir();
        let coordinator =
            DualWriteCoordinator::open(&truth_root, cache_root.as_deref())?;

        Ok(Self {
            coordinator: Mutex::new(coordinator),
            router: ContentRouter::new(),
            decay: DecayEngine::new(config.decay.clone()),
            limiter: Mutex::new(RateLimiter::default()),
            debug: config.server.debug,
        })
    }

    /// Whether error envelopes should carry sanitized debug fields.
    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    /// Rate-limit admission for one operation. Never touches storage.
    pub fn admit(&self, operation: &str) -> Result<(), MemoryError> {
        self.limiter
            .lock()
            .map_err(|e| MemoryError::Internal(format!("limiter lock poisoned: {e}")))?
            .check(operation)
    }

    /// Prune the limiter windows; run from the cooperative cleanup timer.
    pub fn limiter_cleanup(&self) {
        if let Ok(mut limiter) = self.limiter.lock() {
            limiter.cleanup();
        }
    }

    /// Run one decay sweep; `None` when disabled or already running.
    pub fn sweep_once(&self) -> Option<SweepSummary> {
        self.decay.sweep(&self.coordinator)
    }

    pub fn decay_enabled(&self) -> bool {
        self.decay.config().enabled
    }

    pub fn sweep_interval_minutes(&self) -> u64 {
        self.decay.config().sweep_interval_minutes
    }

    /// Save with content-based routing when no layer is given.
    pub fn remember(
        &self,
        content: &str,
        layer: Option<&str>,
        metadata: Option<&Value>,
    ) -> Result<SaveOutcome, MemoryError> {
        let content = validate::validate_content(content)?;
        let envelope = validate::normalize_metadata(metadata)?;

        let decision = match layer {
            Some(name) => RouteDecision::explicit(Layer::resolve(name)?),
            None => self.router.analyze(&content),
        };

        let now = now_secs();
        let importance = envelope.importance.unwrap_or(validate::DEFAULT_IMPORTANCE);
        let emotional_intensity = envelope
            .emotional_intensity
            .unwrap_or(decision.emotional_intensity);
        let timestamp = envelope.timestamp.unwrap_or(now);

        let record = NewRecord {
            timestamp,
            content,
            context: envelope.context.clone(),
            importance,
            emotional_intensity,
            metadata_json: envelope.to_stored_json()?,
            last_accessed: now,
            // At creation no time has elapsed, so the materialized value is
            // the importance itself; immortal records stay pinned there.
            effective_importance: importance,
        };

        let (id, mirrored) = self.coordinator()?.insert_record(decision.layer, &record)?;

        tracing::info!(
            layer = %decision.layer,
            id,
            confidence = decision.confidence,
            routed = layer.is_none(),
            "record saved"
        );

        Ok(SaveOutcome {
            layer: decision.layer.as_str(),
            id,
            timestamp,
            dual_write: mirrored,
        })
    }

    /// Save to an explicitly named layer.
    pub fn save_to_layer(
        &self,
        layer: &str,
        content: &str,
        metadata: Option<&Value>,
    ) -> Result<SaveOutcome, MemoryError> {
        self.remember(content, Some(layer), metadata)
    }

    /// Substring recall across one or all layers, ranked by decayed
    /// importance then recency. Touches every returned record.
    pub fn recall(
        &self,
        query_text: &str,
        layer: Option<&str>,
        limit: Option<i64>,
        include_decayed: bool,
    ) -> Result<Vec<RecalledRecord>, MemoryError> {
        let query_text = validate::validate_query(query_text)?;
        let limit = validate::validate_limit(limit)?;
        let layers: Vec<Layer> = match layer {
            Some(name) => vec![Layer::resolve(name)?],
            None => Layer::ALL.to_vec(),
        };

        let threshold = self.decay.config().threshold;
        let compiled = query::compile_search(&query_text, limit, include_decayed, threshold);

        let mut results: Vec<RecalledRecord> = Vec::new();
        {
            let mut coordinator = self.coordinator()?;
            for target in &layers {
                let rows = coordinator.query_records(*target, &compiled.sql, &compiled.params)?;
                results.extend(rows.into_iter().map(|record| RecalledRecord {
                    layer: target.as_str(),
                    record,
                }));
            }
        }

        results.sort_by(|a, b| {
            b.record
                .rank_importance()
                .partial_cmp(&a.record.rank_importance())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    b.record
                        .timestamp
                        .partial_cmp(&a.record.timestamp)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });
        results.truncate(limit);

        // Touch what we are about to return; errors are logged, not surfaced.
        for target in &layers {
            let ids: Vec<i64> = results
                .iter()
                .filter(|r| r.layer == target.as_str())
                .map(|r| r.record.id)
                .collect();
            if !ids.is_empty() {
                self.decay.touch(&self.coordinator, *target, &ids);
            }
        }

        Ok(results)
    }

    /// Structured scan over a single layer. Does not touch records.
    pub fn query_layer(
        &self,
        layer: &str,
        filters: Option<&Value>,
        order_by: Option<&str>,
        limit: Option<i64>,
        include_decayed: bool,
    ) -> Result<Vec<RecalledRecord>, MemoryError> {
        let layer = Layer::resolve(layer)?;
        let limit = validate::validate_limit(limit)?;

        let filters: QueryFilters = match filters {
            None => QueryFilters::default(),
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|e| MemoryError::InvalidInput(format!("filters: {e}")))?,
        };

        let threshold = self.decay.config().threshold;
        let compiled =
            query::compile_scan(&filters, order_by, limit, include_decayed, threshold)?;

        let rows = self
            .coordinator()?
            .query_records(layer, &compiled.sql, &compiled.params)?;

        Ok(rows
            .into_iter()
            .map(|record| RecalledRecord {
                layer: layer.as_str(),
                record,
            })
            .collect())
    }

    /// Version, health, dual-write configuration, and decay status.
    pub fn status(&self) -> Result<Value, MemoryError> {
        let report = self.coordinator()?.health();
        let decay_config = self.decay.config();
        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "health": report.overall,
            "layers": report.layers,
            "dual_write": {
                "configured": report.dual_write_configured,
                "degraded_layers": report.degraded_layers,
            },
            "decay": {
                "enabled": decay_config.enabled,
                "base_rate": decay_config.base_rate,
                "threshold": decay_config.threshold,
                "immortal_threshold": decay_config.immortal_threshold,
                "sweep_interval_minutes": decay_config.sweep_interval_minutes,
                "sweep_batch_size": decay_config.sweep_batch_size,
                "sweep_running": self.decay.is_sweep_running(),
                "stats": self.decay.stats(),
            },
        }))
    }

    /// Per-layer aggregates plus the decay configuration echo.
    pub fn stats(&self) -> Result<Value, MemoryError> {
        let decay_config = self.decay.config();
        let layers = {
            let mut coordinator = self.coordinator()?;
            stats::all_layer_stats(&mut coordinator, decay_config)?
        };
        Ok(json!({
            "layers": layers,
            "decay": {
                "enabled": decay_config.enabled,
                "base_rate": decay_config.base_rate,
                "threshold": decay_config.threshold,
                "immortal_threshold": decay_config.immortal_threshold,
            },
        }))
    }

    /// Direct read of one record; used by tests and the doctor command.
    pub fn get_record(
        &self,
        layer: Layer,
        id: i64,
    ) -> Result<Option<MemoryRecord>, MemoryError> {
        self.coordinator()?.get_record(layer, id)
    }
}
