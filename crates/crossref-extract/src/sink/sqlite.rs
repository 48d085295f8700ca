//! Relational sink: one `articles` row per record.
//!
//! Records are stored verbatim as JSON text. There is no deduplication, so
//! re-running an archive inserts its records again.

use super::{ArchiveOutcome, Sink};
use crate::catalog;
use crate::{Error, Result};
use crossref_core::Record;
use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SINK_NAME: &str = "sqlite";

const INSERT_ARTICLE_SQL: &str = "INSERT INTO articles (data) VALUES (?1)";

/// Configuration for [`SqliteSink`].
#[derive(Debug, Clone)]
pub struct SqliteSinkConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Wrap each archive in a transaction (commit on done, roll back on abort).
    pub per_archive_transaction: bool,
    /// Add unseen publication names to `journals` as disabled.
    pub track_publications: bool,
    /// Log a progress line every N inserted records (0 disables).
    pub progress_interval: u64,
}

impl Default for SqliteSinkConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/crossref.db"),
            per_archive_transaction: false,
            track_publications: false,
            progress_interval: 1000,
        }
    }
}

/// Inserts each matched record into the `articles` table.
pub struct SqliteSink {
    conn: Connection,
    config: SqliteSinkConfig,
    in_transaction: bool,
    archive_written: u64,
    total_written: u64,
}

impl SqliteSink {
    /// Open the database at `config.db_path`, creating the schema if needed.
    pub fn connect(config: SqliteSinkConfig) -> Result<Self> {
        let conn = catalog::open_database(&config.db_path)?;
        info!("Opened SQLite sink at {}", config.db_path.display());
        Self::with_connection(conn, config)
    }

    /// Use an existing connection (e.g. in-memory for tests).
    pub fn with_connection(conn: Connection, config: SqliteSinkConfig) -> Result<Self> {
        catalog::init_schema(&conn)?;
        Ok(Self {
            conn,
            config,
            in_transaction: false,
            archive_written: 0,
            total_written: 0,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Rows inserted since construction (including rolled-back ones).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    fn insert(&self, data: &str, publication: &str) -> rusqlite::Result<()> {
        self.conn.prepare_cached(INSERT_ARTICLE_SQL)?.execute([data])?;
        if self.config.track_publications
            && catalog::register_discovered(&self.conn, publication)?
        {
            info!("Discovered new publication '{}' (disabled)", publication);
        }
        Ok(())
    }
}

/// Split SQLite failures into per-record and connection-level errors.
fn classify(e: rusqlite::Error) -> Error {
    let record_scoped = match &e {
        rusqlite::Error::SqliteFailure(err, _) => matches!(
            err.code,
            ErrorCode::ConstraintViolation | ErrorCode::TypeMismatch | ErrorCode::TooBig
        ),
        rusqlite::Error::ToSqlConversionFailure(_) => true,
        _ => false,
    };
    if record_scoped {
        Error::SinkWrite {
            sink: SINK_NAME,
            reason: e.to_string(),
        }
    } else {
        unavailable(e)
    }
}

fn unavailable(e: rusqlite::Error) -> Error {
    Error::SinkUnavailable {
        sink: SINK_NAME,
        reason: e.to_string(),
    }
}

impl Sink for SqliteSink {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    fn open(&mut self, archive: &Path) -> Result<()> {
        self.archive_written = 0;
        // Fails early if the schema went away under us.
        self.conn
            .prepare_cached(INSERT_ARTICLE_SQL)
            .map_err(unavailable)?;

        if self.config.per_archive_transaction {
            self.conn.execute_batch("BEGIN").map_err(unavailable)?;
            self.in_transaction = true;
            debug!("Began transaction for {}", archive.display());
        }
        Ok(())
    }

    fn accept(&mut self, record: &Record, publication: &str) -> Result<()> {
        let data = serde_json::to_string(record).map_err(|e| Error::SinkWrite {
            sink: SINK_NAME,
            reason: e.to_string(),
        })?;
        self.insert(&data, publication).map_err(classify)?;

        self.archive_written += 1;
        self.total_written += 1;
        let interval = self.config.progress_interval;
        if interval > 0 && self.total_written % interval == 0 {
            info!("Progress: {} articles inserted", self.total_written);
        }
        Ok(())
    }

    fn close(&mut self, outcome: ArchiveOutcome) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;

        match outcome {
            ArchiveOutcome::Done => {
                self.conn.execute_batch("COMMIT").map_err(unavailable)?;
                debug!("Committed {} articles", self.archive_written);
            }
            ArchiveOutcome::Aborted => {
                self.conn.execute_batch("ROLLBACK").map_err(unavailable)?;
                warn!(
                    "Rolled back {} articles from aborted archive",
                    self.archive_written
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkSession;
    use crossref_core::TargetLookup;
    use serde_json::json;
    use tempfile::TempDir;

    fn memory_sink(per_archive_transaction: bool, track_publications: bool) -> SqliteSink {
        let conn = Connection::open_in_memory().unwrap();
        SqliteSink::with_connection(
            conn,
            SqliteSinkConfig {
                db_path: PathBuf::from(":memory:"),
                per_archive_transaction,
                track_publications,
                progress_interval: 2,
            },
        )
        .unwrap()
    }

    fn article_count(sink: &SqliteSink) -> i64 {
        sink.connection()
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))
            .unwrap()
    }

    fn archive() -> &'static Path {
        Path::new("0.json.gz")
    }

    // =========================================================================
    // Inserts
    // =========================================================================

    #[test]
    fn test_insert_stores_record_verbatim() {
        let mut sink = memory_sink(false, false);
        let record: Record =
            serde_json::from_str(r#"{"DOI": "10.1/a", "container-title": ["Heredity"], "z": 1, "a": 2}"#)
                .unwrap();

        sink.open(archive()).unwrap();
        sink.accept(&record, "Heredity").unwrap();
        sink.close(ArchiveOutcome::Done).unwrap();

        let data: String = sink
            .connection()
            .query_row("SELECT data FROM articles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(data, serde_json::to_string(&record).unwrap());

        let doi: String = sink
            .connection()
            .query_row("SELECT json_extract(data, '$.DOI') FROM articles", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(doi, "10.1/a");
    }

    #[test]
    fn test_rerun_duplicates_rows() {
        let mut sink = memory_sink(false, false);
        let record = json!({"DOI": "10.1/a"});

        for _ in 0..2 {
            sink.open(archive()).unwrap();
            sink.accept(&record, "Heredity").unwrap();
            sink.close(ArchiveOutcome::Done).unwrap();
        }

        assert_eq!(article_count(&sink), 2);
        assert_eq!(sink.total_written(), 2);
    }

    #[test]
    fn test_rejected_insert_is_record_scoped() {
        let mut sink = memory_sink(false, false);
        sink.connection()
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON articles
                 WHEN json_extract(NEW.data, '$.DOI') = 'bad'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        sink.open(archive()).unwrap();
        let err = sink.accept(&json!({"DOI": "bad"}), "Heredity").unwrap_err();
        assert!(matches!(err, Error::SinkWrite { sink: "sqlite", .. }));
        assert!(err.is_record_scoped());

        sink.accept(&json!({"DOI": "good"}), "Heredity").unwrap();
        sink.close(ArchiveOutcome::Done).unwrap();

        assert_eq!(article_count(&sink), 1);
    }

    #[test]
    fn test_missing_table_is_fatal() {
        let mut sink = memory_sink(false, false);
        sink.connection()
            .execute_batch("DROP TABLE articles")
            .unwrap();

        let err = sink.open(archive()).unwrap_err();
        assert!(err.is_fatal());
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    #[test]
    fn test_transaction_commits_on_done() {
        let mut sink = memory_sink(true, false);

        sink.open(archive()).unwrap();
        sink.accept(&json!({"DOI": "10.1/a"}), "Heredity").unwrap();
        sink.accept(&json!({"DOI": "10.1/b"}), "Heredity").unwrap();
        assert!(!sink.connection().is_autocommit());
        sink.close(ArchiveOutcome::Done).unwrap();

        assert!(sink.connection().is_autocommit());
        assert_eq!(article_count(&sink), 2);
    }

    #[test]
    fn test_transaction_rolls_back_on_abort() {
        let mut sink = memory_sink(true, false);

        sink.open(archive()).unwrap();
        sink.accept(&json!({"DOI": "10.1/a"}), "Heredity").unwrap();
        sink.close(ArchiveOutcome::Aborted).unwrap();

        assert_eq!(article_count(&sink), 0);
    }

    #[test]
    fn test_dropped_session_rolls_back() {
        let mut sink = memory_sink(true, false);
        {
            let mut session = SinkSession::open(&mut sink, archive()).unwrap();
            session.accept(&json!({"DOI": "10.1/a"}), "Heredity").unwrap();
        }

        assert!(sink.connection().is_autocommit());
        assert_eq!(article_count(&sink), 0);
    }

    #[test]
    fn test_close_without_transaction_is_noop() {
        let mut sink = memory_sink(false, false);
        sink.open(archive()).unwrap();
        sink.accept(&json!({"DOI": "10.1/a"}), "Heredity").unwrap();
        sink.close(ArchiveOutcome::Aborted).unwrap();

        assert_eq!(article_count(&sink), 1);
    }

    // =========================================================================
    // Publication tracking
    // =========================================================================

    #[test]
    fn test_track_publications_registers_disabled() {
        let mut sink = memory_sink(false, true);
        catalog::upsert_journal(sink.connection(), "Heredity", true).unwrap();

        sink.open(archive()).unwrap();
        sink.accept(&json!({"DOI": "10.1/a"}), "Heredity").unwrap();
        sink.accept(&json!({"DOI": "10.1/b"}), "Genetics Today").unwrap();
        sink.close(ArchiveOutcome::Done).unwrap();

        let targets = catalog::load_targets(sink.connection()).unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets.is_target("Heredity"));
        assert!(!targets.is_target("Genetics Today"));
    }

    #[test]
    fn test_tracking_off_leaves_catalog_alone() {
        let mut sink = memory_sink(false, false);
        sink.open(archive()).unwrap();
        sink.accept(&json!({"DOI": "10.1/a"}), "Heredity").unwrap();
        sink.close(ArchiveOutcome::Done).unwrap();

        assert!(catalog::list_journals(sink.connection()).unwrap().is_empty());
    }

    // =========================================================================
    // File-backed database
    // =========================================================================

    #[test]
    fn test_open_file_database() {
        let dir = TempDir::new().unwrap();
        let config = SqliteSinkConfig {
            db_path: dir.path().join("out.db"),
            ..Default::default()
        };

        let mut sink = SqliteSink::connect(config.clone()).unwrap();
        sink.open(archive()).unwrap();
        sink.accept(&json!({"DOI": "10.1/a"}), "Heredity").unwrap();
        sink.close(ArchiveOutcome::Done).unwrap();
        drop(sink);

        let sink = SqliteSink::connect(config).unwrap();
        assert_eq!(article_count(&sink), 1);
    }
}
