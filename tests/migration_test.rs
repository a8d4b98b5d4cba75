use rusqlite::Connection;
use strata::db;
use strata::db::migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};

/// Build an on-disk pre-decay (v1) layer store by hand.
fn legacy_store(path: &std::path::Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE memories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp REAL NOT NULL,
            content TEXT NOT NULL,
            event TEXT NOT NULL,
            context TEXT NOT NULL DEFAULT '',
            importance REAL NOT NULL DEFAULT 0.7,
            emotional_intensity REAL NOT NULL DEFAULT 0.5,
            metadata TEXT
        );
        CREATE INDEX idx_memories_timestamp ON memories(timestamp);
        CREATE INDEX idx_memories_importance ON memories(importance);
        CREATE TABLE schema_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
        INSERT INTO schema_meta (key, value) VALUES ('schema_version', '1');
        INSERT INTO memories (timestamp, content, event, importance)
            VALUES (1700000000.25, 'legacy row', 'legacy row', 0.65);
        "#,
    )
    .unwrap();
}

#[test]
fn opening_twice_is_observably_equivalent_to_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("semantic_memory.db");

    {
        let conn = db::open_layer_store(&path).unwrap();
        conn.execute(
            "INSERT INTO memories (timestamp, content, event) VALUES (1.0, 'kept', 'kept')",
            [],
        )
        .unwrap();
    }

    let conn = db::open_layer_store(&path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn legacy_store_is_migrated_with_backfill() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("episodic_memory.db");
    legacy_store(&path);

    let conn = db::open_layer_store(&path).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);

    let (last_accessed, effective, access_count): (f64, f64, i64) = conn
        .query_row(
            "SELECT last_accessed, effective_importance, access_count FROM memories",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert!((last_accessed - 1700000000.25).abs() < 1e-6);
    assert!((effective - 0.65).abs() < 1e-9);
    assert_eq!(access_count, 0);
}

#[test]
fn migrating_twice_loses_no_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("working_memory.db");
    legacy_store(&path);

    {
        let conn = db::open_layer_store(&path).unwrap();
        run_migrations(&conn).unwrap();
    }
    let conn = db::open_layer_store(&path).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
    let content: String = conn
        .query_row("SELECT content FROM memories", [], |row| row.get(0))
        .unwrap();
    assert_eq!(content, "legacy row");
}

#[test]
fn migrated_legacy_rows_are_usable_by_the_service() {
    let dir = tempfile::tempdir().unwrap();
    legacy_store(&dir.path().join("episodic_memory.db"));

    let mut config = strata::config::StrataConfig::default();
    config.storage.data_dir = dir.path().to_string_lossy().into_owned();
    let service = strata::memory::service::MemoryService::open(&config).unwrap();

    let results = service.recall("legacy row", Some("episodic"), None, false).unwrap();
    assert_eq!(results.len(), 1);
    // Back-fill pinned the effective importance to the raw importance.
    assert!((results[0].record.effective_importance.unwrap() - 0.65).abs() < 1e-9);
}
