#![allow(dead_code)]

use rusqlite::Connection;
use strata::config::StrataConfig;
use strata::memory::service::MemoryService;
use strata::memory::types::Layer;
use tempfile::TempDir;

/// A service over fresh temp roots. The temp dirs live as long as the
/// fixture so the files stay on disk for direct inspection.
pub struct TestService {
    pub service: MemoryService,
    pub truth: TempDir,
    pub cache: Option<TempDir>,
}

/// Service with dual-write enabled (truth + cache roots).
pub fn dual_service() -> TestService {
    let truth = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let mut config = StrataConfig::default();
    config.storage.data_dir = truth.path().to_string_lossy().into_owned();
    config.storage.cache_dir = Some(cache.path().to_string_lossy().into_owned());
    let service = MemoryService::open(&config).unwrap();
    TestService {
        service,
        truth,
        cache: Some(cache),
    }
}

/// Service with only the durable root configured.
pub fn primary_service() -> TestService {
    let truth = tempfile::tempdir().unwrap();
    let mut config = StrataConfig::default();
    config.storage.data_dir = truth.path().to_string_lossy().into_owned();
    let service = MemoryService::open(&config).unwrap();
    TestService {
        service,
        truth,
        cache: None,
    }
}

impl TestService {
    /// Open a direct connection to a layer's truth file, bypassing the
    /// service. For fixture setup and post-hoc assertions only; use it on
    /// primary-only services so the cache cannot go stale unnoticed.
    pub fn truth_conn(&self, layer: Layer) -> Connection {
        Connection::open(self.truth.path().join(layer.file_name())).unwrap()
    }

    /// Open a direct connection to a layer's cache file.
    pub fn cache_conn(&self, layer: Layer) -> Connection {
        let cache = self.cache.as_ref().expect("cache root configured");
        Connection::open(cache.path().join(layer.file_name())).unwrap()
    }

    /// Backdate a record's last access by the given number of days.
    pub fn backdate_access(&self, layer: Layer, id: i64, days: f64) {
        let conn = self.truth_conn(layer);
        conn.execute(
            "UPDATE memories SET last_accessed = last_accessed - ?1 WHERE id = ?2",
            rusqlite::params![days * 86_400.0, id],
        )
        .unwrap();
    }
}
