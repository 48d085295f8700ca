//! SQLite schema for extracted articles and the journal catalog.
//!
//! Bootstrap only: tables are created if absent and the version is recorded.
//! There is no migration path yet.

use rusqlite::{Connection, Result};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Create all tables if they don't exist.
pub fn init_schema(conn: &Connection) -> Result<()> {
    if schema_version(conn)? == 0 {
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }
    Ok(())
}

/// Current schema version (0 if not initialized).
pub fn schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per extracted record, stored verbatim
        CREATE TABLE IF NOT EXISTS articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            data TEXT NOT NULL CHECK (json_valid(data))
        );

        -- Target publications; only enabled rows are extracted
        CREATE TABLE IF NOT EXISTS journals (
            name TEXT PRIMARY KEY,
            enabled INTEGER NOT NULL DEFAULT 0,
            added_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_journals_enabled ON journals(enabled);
        "#,
    )?;
    Ok(())
}
