//! Dual-write coordination between the truth store and the cache store.
//!
//! Truth is authoritative. Every mutation goes to the truth copy first and
//! must succeed there; the cache copy is best effort. Reads prefer the cache
//! for latency and fall back to truth on any cache trouble. A layer whose
//! cache fell behind is marked for reseeding and is re-hydrated by a byte
//! copy of the truth file on the next read.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::db;
use crate::error::MemoryError;
use crate::memory::query::SELECT_COLUMNS;
use crate::memory::types::{Layer, MemoryRecord, NewRecord};

/// One ordered statement of a batch write.
#[derive(Debug)]
pub struct BatchOp {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Per-layer health as reported by `get_status`.
#[derive(Debug, Serialize)]
pub struct LayerHealth {
    /// `"connected"`, `"missing"`, or `"error"`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `"healthy"` or `"degraded"`.
    pub overall: &'static str,
    pub layers: BTreeMap<&'static str, LayerHealth>,
    pub dual_write_configured: bool,
    /// Layers currently serving reads from truth while their cache reseeds.
    pub degraded_layers: Vec<&'static str>,
}

struct LayerHandle {
    truth: Connection,
    cache: Option<Connection>,
}

pub struct DualWriteCoordinator {
    truth_root: PathBuf,
    cache_root: Option<PathBuf>,
    handles: HashMap<Layer, LayerHandle>,
    /// Layers whose cache copy is stale (a cache write or read failed).
    needs_reseed: HashSet<Layer>,
}

impl DualWriteCoordinator {
    /// Open every layer under the durable root, mirroring into the cache
    /// root when one is configured and usable.
    ///
    /// A truth-side failure is fatal; a cache-side failure downgrades to
    /// primary-only operation.
    pub fn open(truth_root: &Path, cache_root: Option<&Path>) -> Result<Self, MemoryError> {
        std::fs::create_dir_all(truth_root).map_err(|e| {
            MemoryError::Configuration(format!("durable root is not usable: {e}"))
        })?;

        let cache_root = cache_root.and_then(|root| match std::fs::create_dir_all(root) {
            Ok(()) => Some(root.to_path_buf()),
            Err(e) => {
                warn!(error = %e, "cache root is not usable, running primary-only");
                None
            }
        });

        let mut coordinator = Self {
            truth_root: truth_root.to_path_buf(),
            cache_root,
            handles: HashMap::new(),
            needs_reseed: HashSet::new(),
        };

        for layer in Layer::ALL {
            let handle = coordinator.open_layer(layer)?;
            coordinator.handles.insert(layer, handle);
        }

        Ok(coordinator)
    }

    fn truth_path(&self, layer: Layer) -> PathBuf {
        self.truth_root.join(layer.file_name())
    }

    fn cache_path(&self, layer: Layer) -> Option<PathBuf> {
        self.cache_root.as_ref().map(|root| root.join(layer.file_name()))
    }

    fn open_layer(&mut self, layer: Layer) -> Result<LayerHandle, MemoryError> {
        let truth_path = self.truth_path(layer);
        let truth_existed = truth_path.exists();
        let truth = db::open_layer_store(&truth_path)
            .map_err(|e| MemoryError::Configuration(format!("cannot open layer {layer}: {e}")))?;

        let cache = match self.cache_path(layer) {
            None => None,
            Some(cache_path) => {
                // A missing cache file is seeded from truth before first use;
                // a missing truth file means this is a fresh layer.
                if !cache_path.exists() && truth_existed {
                    if let Err(e) = seed_cache_file(&truth, &truth_path, &cache_path) {
                        warn!(layer = %layer, error = %e, "cache seeding failed");
                    }
                }
                match db::open_layer_store(&cache_path) {
                    Ok(conn) => Some(conn),
                    Err(e) => {
                        warn!(layer = %layer, error = %e, "cache open failed, reading truth");
                        self.needs_reseed.insert(layer);
                        None
                    }
                }
            }
        };

        Ok(LayerHandle { truth, cache })
    }

    /// Whether a cache root is configured at all.
    pub fn dual_write_configured(&self) -> bool {
        self.cache_root.is_some()
    }

    /// Insert a record: truth first (fatal on failure), then the cache copy
    /// with the truth-assigned id. Returns `(id, mirrored)`.
    pub fn insert_record(
        &mut self,
        layer: Layer,
        record: &NewRecord,
    ) -> Result<(i64, bool), MemoryError> {
        let handle = self.handles.get(&layer).ok_or_else(|| no_handle(layer))?;

        handle
            .truth
            .execute(
                "INSERT INTO memories (timestamp, content, event, context, importance, \
                 emotional_intensity, metadata, last_accessed, effective_importance, access_count) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
                rusqlite::params![
                    record.timestamp,
                    record.content,
                    record.content, // event mirrors content for legacy search parity
                    record.context,
                    record.importance,
                    record.emotional_intensity,
                    record.metadata_json,
                    record.last_accessed,
                    record.effective_importance,
                ],
            )
            .map_err(MemoryError::write)?;
        let id = handle.truth.last_insert_rowid();

        let mut mirrored = false;
        if let Some(cache) = &handle.cache {
            let result = cache.execute(
                "INSERT INTO memories (id, timestamp, content, event, context, importance, \
                 emotional_intensity, metadata, last_accessed, effective_importance, access_count) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0)",
                rusqlite::params![
                    id,
                    record.timestamp,
                    record.content,
                    record.content,
                    record.context,
                    record.importance,
                    record.emotional_intensity,
                    record.metadata_json,
                    record.last_accessed,
                    record.effective_importance,
                ],
            );
            match result {
                Ok(_) => mirrored = true,
                Err(e) => {
                    warn!(layer = %layer, error = %e, "cache insert failed (truth is safe)");
                    self.needs_reseed.insert(layer);
                }
            }
        }

        Ok((id, mirrored))
    }

    /// Apply an ordered batch of statements: all of them to truth (first
    /// failure aborts the operation), then all of them to the cache (first
    /// failure marks the layer for reseed).
    ///
    /// Batches are not atomic across the two targets; ordering within each
    /// target is preserved.
    pub fn apply_batch(&mut self, layer: Layer, ops: &[BatchOp]) -> Result<(), MemoryError> {
        let handle = self.handles.get(&layer).ok_or_else(|| no_handle(layer))?;

        for op in ops {
            handle
                .truth
                .execute(&op.sql, params_from_iter(op.params.iter()))
                .map_err(MemoryError::write)?;
        }

        let mut cache_failed = false;
        if let Some(cache) = &handle.cache {
            for op in ops {
                if let Err(e) = cache.execute(&op.sql, params_from_iter(op.params.iter())) {
                    warn!(layer = %layer, error = %e, "cache batch write failed (truth is safe)");
                    cache_failed = true;
                    break;
                }
            }
        }
        if cache_failed {
            self.needs_reseed.insert(layer);
        }

        Ok(())
    }

    /// Run a scan, preferring the cache copy. Falls back to truth when the
    /// cache is marked stale, unavailable, or errors mid-read.
    pub fn query_records(
        &mut self,
        layer: Layer,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.query_rows(layer, sql, params, MemoryRecord::from_row)
    }

    /// Generic read with cache preference and truth fallback.
    pub fn query_rows<T>(
        &mut self,
        layer: Layer,
        sql: &str,
        params: &[SqlValue],
        mapper: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, MemoryError> {
        if self.needs_reseed.contains(&layer) {
            self.try_reseed(layer);
        }

        let handle = self.handles.get(&layer).ok_or_else(|| no_handle(layer))?;

        let mut cache_error = false;
        if !self.needs_reseed.contains(&layer) {
            if let Some(cache) = &handle.cache {
                match run_query(cache, sql, params, mapper) {
                    Ok(rows) => return Ok(rows),
                    Err(e) => {
                        warn!(layer = %layer, error = %e, "cache read failed, falling back to truth");
                        cache_error = true;
                    }
                }
            }
        }

        let rows = run_query(&handle.truth, sql, params, mapper).map_err(MemoryError::database);
        if cache_error {
            self.needs_reseed.insert(layer);
        }
        rows
    }

    /// Rebuild a stale cache copy from the truth file.
    fn try_reseed(&mut self, layer: Layer) {
        let Some(cache_path) = self.cache_path(layer) else {
            self.needs_reseed.remove(&layer);
            return;
        };
        let truth_path = self.truth_path(layer);

        let Some(handle) = self.handles.get_mut(&layer) else {
            return;
        };

        // Close the stale handle before replacing the file underneath it.
        drop(handle.cache.take());

        match seed_cache_file(&handle.truth, &truth_path, &cache_path) {
            Ok(()) => match db::open_layer_store(&cache_path) {
                Ok(conn) => {
                    debug!(layer = %layer, "cache reseeded from truth");
                    handle.cache = Some(conn);
                    self.needs_reseed.remove(&layer);
                }
                Err(e) => {
                    warn!(layer = %layer, error = %e, "cache reopen after reseed failed");
                }
            },
            Err(e) => {
                warn!(layer = %layer, error = %e, "cache reseed failed");
            }
        }
    }

    /// Probe every layer and build the health report.
    pub fn health(&self) -> HealthReport {
        let mut layers = BTreeMap::new();
        let mut degraded = false;

        for layer in Layer::ALL {
            let truth_path = self.truth_path(layer);
            let health = if !truth_path.exists() {
                degraded = true;
                LayerHealth {
                    status: "missing",
                    count: None,
                    path: Some(truth_path.display().to_string()),
                }
            } else {
                match self.handles.get(&layer).map(|h| {
                    h.truth
                        .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get::<_, i64>(0))
                }) {
                    Some(Ok(count)) => LayerHealth {
                        status: "connected",
                        count: Some(count),
                        path: Some(truth_path.display().to_string()),
                    },
                    _ => {
                        degraded = true;
                        LayerHealth {
                            status: "error",
                            count: None,
                            path: Some(truth_path.display().to_string()),
                        }
                    }
                }
            };
            layers.insert(layer.as_str(), health);
        }

        let degraded_layers: Vec<&'static str> = Layer::ALL
            .iter()
            .filter(|l| self.needs_reseed.contains(l))
            .map(|l| l.as_str())
            .collect();
        if !degraded_layers.is_empty() {
            degraded = true;
        }

        HealthReport {
            overall: if degraded { "degraded" } else { "healthy" },
            layers,
            dual_write_configured: self.dual_write_configured(),
            degraded_layers,
        }
    }

    /// Fetch single records by id from the truth copy (used by tests and
    /// the touch path's read-back).
    pub fn get_record(
        &mut self,
        layer: Layer,
        id: i64,
    ) -> Result<Option<MemoryRecord>, MemoryError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM memories WHERE id = ?1");
        let rows = self.query_records(layer, &sql, &[SqlValue::from(id)])?;
        Ok(rows.into_iter().next())
    }

    /// Break the cache copy of a layer (drops its table). Test-only hook for
    /// exercising the cache-failure path.
    #[cfg(test)]
    pub fn sabotage_cache(&mut self, layer: Layer) {
        if let Some(cache) = self.handles.get(&layer).and_then(|h| h.cache.as_ref()) {
            cache.execute_batch("DROP TABLE memories").unwrap();
        }
    }
}

fn no_handle(layer: Layer) -> MemoryError {
    MemoryError::Connection(format!("no store handle for layer {layer}"))
}

fn run_query<T>(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
    mapper: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), mapper)?
        .collect::<rusqlite::Result<Vec<T>>>()?;
    Ok(rows)
}

/// Byte-copy the truth file into the cache path, checkpointing first so the
/// main file is complete, and clearing any stale cache sidecar files.
fn seed_cache_file(
    truth: &Connection,
    truth_path: &Path,
    cache_path: &Path,
) -> std::io::Result<()> {
    db::checkpoint(truth).map_err(std::io::Error::other)?;
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = cache_path.as_os_str().to_owned();
        sidecar.push(suffix);
        let _ = std::fs::remove_file(PathBuf::from(sidecar));
    }
    let _ = std::fs::remove_file(cache_path);
    std::fs::copy(truth_path, cache_path)?;
    Ok(())
}
