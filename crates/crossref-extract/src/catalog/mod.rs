//! Persisted journal catalog.
//!
//! The `journals` table is the database-backed target set: operators enable
//! the publications they want extracted, and the SQLite sink can record every
//! publication it sees (disabled) so new ones can be discovered.

mod schema;

pub use schema::{SCHEMA_VERSION, init_schema, schema_version};

use crate::{Error, Result};
use crossref_core::{BUILTIN_JOURNALS, TargetSet};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::path::Path;

/// One row of the `journals` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalRow {
    pub name: String,
    pub enabled: bool,
    /// RFC 3339 timestamp of first insertion.
    pub added_at: String,
}

const REGISTER_SQL: &str =
    "INSERT OR IGNORE INTO journals (name, enabled, added_at) VALUES (?1, 0, ?2)";

/// Open (or create) a database file with the schema in place.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)
        .map_err(|e| Error::Database(format!("Failed to open {}: {}", path.display(), e)))?;

    // WAL keeps readers (catalog listing, reporting) unblocked during a run
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
    init_schema(&conn)?;
    Ok(conn)
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Load every journal into a [`TargetSet`]; only enabled ones match.
pub fn load_targets(conn: &Connection) -> Result<TargetSet> {
    let mut stmt = conn.prepare("SELECT name, enabled FROM journals")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
    })?;
    let targets = rows.collect::<rusqlite::Result<TargetSet>>()?;
    Ok(targets)
}

/// All journals, sorted by name.
pub fn list_journals(conn: &Connection) -> Result<Vec<JournalRow>> {
    let mut stmt = conn.prepare("SELECT name, enabled, added_at FROM journals ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(JournalRow {
            name: row.get(0)?,
            enabled: row.get(1)?,
            added_at: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Insert a journal, or set the flag of an existing one.
pub fn upsert_journal(conn: &Connection, name: &str, enabled: bool) -> Result<()> {
    let name = validate_name(name)?;
    conn.execute(
        "INSERT INTO journals (name, enabled, added_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO UPDATE SET enabled = excluded.enabled",
        params![name, enabled, now()],
    )?;
    Ok(())
}

/// Flip the flag of a known journal.
///
/// Fails with [`Error::Config`] if the journal is not in the catalog.
pub fn set_enabled(conn: &Connection, name: &str, enabled: bool) -> Result<()> {
    let updated = conn.execute(
        "UPDATE journals SET enabled = ?2 WHERE name = ?1",
        params![name, enabled],
    )?;
    if updated == 0 {
        return Err(Error::Config(format!("unknown journal '{}'", name)));
    }
    Ok(())
}

/// Look up a single journal.
pub fn get_journal(conn: &Connection, name: &str) -> Result<Option<JournalRow>> {
    let row = conn
        .query_row(
            "SELECT name, enabled, added_at FROM journals WHERE name = ?1",
            [name],
            |row| {
                Ok(JournalRow {
                    name: row.get(0)?,
                    enabled: row.get(1)?,
                    added_at: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Insert the compiled-in journals as enabled, leaving existing rows alone.
///
/// Returns the number of journals inserted.
pub fn seed_builtin(conn: &Connection) -> Result<usize> {
    let added_at = now();
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO journals (name, enabled, added_at) VALUES (?1, 1, ?2)",
    )?;
    let mut inserted = 0;
    for name in BUILTIN_JOURNALS {
        inserted += stmt.execute(params![name, added_at])?;
    }
    Ok(inserted)
}

/// Record a publication seen during extraction, disabled, if it is new.
///
/// Returns true when a row was inserted. Existing flags are never changed.
pub fn register_discovered(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare_cached(REGISTER_SQL)?;
    Ok(stmt.execute(params![name, now()])? > 0)
}

fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("journal name is empty".to_string()));
    }
    Ok(trimmed)
}
