//! SQL DDL for a single layer store.
//!
//! Every layer file carries the same two tables: `memories` (the records)
//! and `schema_meta` (version tracking). All DDL uses `IF NOT EXISTS` for
//! idempotent initialization.

use rusqlite::Connection;

/// Schema DDL for one layer store.
///
/// `event` mirrors `content` for legacy search parity; both columns are
/// populated on every insert and both are matched by substring search.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS memories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp REAL NOT NULL,
    content TEXT NOT NULL,
    event TEXT NOT NULL,
    context TEXT NOT NULL DEFAULT '',
    importance REAL NOT NULL DEFAULT 0.7,
    emotional_intensity REAL NOT NULL DEFAULT 0.5,
    metadata TEXT,
    last_accessed REAL,
    effective_importance REAL,
    access_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_memories_timestamp ON memories(timestamp);
CREATE INDEX IF NOT EXISTS idx_memories_importance ON memories(importance);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize the layer schema. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
