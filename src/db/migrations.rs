//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring a layer store up to [`CURRENT_SCHEMA_VERSION`]. Migrations are
//! additive: columns are added if missing and existing rows are back-filled,
//! never rewritten or dropped.

use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Get the current schema version from the store.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations.
///
/// A store whose version is above [`CURRENT_SCHEMA_VERSION`] was written by
/// a newer binary and is refused.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    if version > CURRENT_SCHEMA_VERSION {
        return Err(rusqlite::Error::InvalidQuery);
    }

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        match next {
            2 => migrate_v1_to_v2(conn)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }

        update_schema_version(conn, next)?;
        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: add the decay columns.
///
/// Pre-decay stores lack `last_accessed`, `effective_importance`, and
/// `access_count`. Each column is added only if missing, with existing rows
/// back-filled (`last_accessed ← timestamp`, `effective_importance ←
/// importance`, `access_count ← 0`).
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    if add_column_if_missing(conn, "last_accessed", "REAL")? {
        conn.execute("UPDATE memories SET last_accessed = timestamp", [])?;
    }
    if add_column_if_missing(conn, "effective_importance", "REAL")? {
        conn.execute("UPDATE memories SET effective_importance = importance", [])?;
    }
    // The DEFAULT back-fills existing rows; no UPDATE needed.
    add_column_if_missing(conn, "access_count", "INTEGER NOT NULL DEFAULT 0")?;
    Ok(())
}

/// Add a column to `memories` unless it already exists.
///
/// Returns `true` if the column was added by this call.
fn add_column_if_missing(
    conn: &Connection,
    column: &str,
    definition: &str,
) -> rusqlite::Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info('memories') WHERE name = ?1",
        [column],
        |row| row.get(0),
    )?;
    if exists {
        return Ok(false);
    }
    conn.execute_batch(&format!("ALTER TABLE memories ADD COLUMN {column} {definition}"))?;
    Ok(true)
}
