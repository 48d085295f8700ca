//! Destinations for matched records.
//!
//! - [`ConsoleSink`] - One compact JSON line per record on a writer (stdout)
//! - [`FileTreeSink`] - `<root>/<publication>/<doi>/metadata.json`
//! - [`SqliteSink`] - One row per record in the `articles` table
//!
//! # Lifecycle
//!
//! A sink is constructed once per invocation (opening files or database
//! connections), then bracketed per archive:
//!
//! ```text
//! open(archive) → accept(record, publication)* → close(Done | Aborted)
//! ```
//!
//! The runner drives this through a [`SinkSession`], which guarantees that
//! `close` runs exactly once even if the archive is abandoned midway.

mod console;
mod file_tree;
mod sqlite;

pub use console::ConsoleSink;
pub use file_tree::{FileTreeConfig, FileTreeSink, METADATA_FILE_NAME, relative_path, sanitize_segment};
pub use sqlite::{SqliteSink, SqliteSinkConfig};

use crate::Result;
use crossref_core::Record;
use std::path::Path;

/// How an archive run ended, as seen by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The decoder reported exhaustion.
    Done,
    /// The run stopped early (malformed record or fatal sink error).
    Aborted,
}

/// A destination for matched records.
///
/// Records from different archives may arrive in any order; implementations
/// must not rely on traversal order.
pub trait Sink {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Prepare to receive records from `archive`.
    fn open(&mut self, _archive: &Path) -> Result<()> {
        Ok(())
    }

    /// Store or emit one matched record.
    ///
    /// Record-scoped failures ([`crate::Error::MissingIdentifier`],
    /// [`crate::Error::SinkWrite`]) let the archive continue;
    /// [`crate::Error::SinkUnavailable`] stops the run.
    fn accept(&mut self, record: &Record, publication: &str) -> Result<()>;

    /// Release per-archive resources.
    fn close(&mut self, _outcome: ArchiveOutcome) -> Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&mut self, archive: &Path) -> Result<()> {
        (**self).open(archive)
    }

    fn accept(&mut self, record: &Record, publication: &str) -> Result<()> {
        (**self).accept(record, publication)
    }

    fn close(&mut self, outcome: ArchiveOutcome) -> Result<()> {
        (**self).close(outcome)
    }
}

/// An opened sink for the duration of one archive.
///
/// Closing happens either through [`SinkSession::finish`] or, if the session
/// is dropped first, on drop with [`ArchiveOutcome::Aborted`].
pub struct SinkSession<'a> {
    sink: &'a mut dyn Sink,
    closed: bool,
}

impl<'a> SinkSession<'a> {
    /// Open `sink` for `archive`.
    pub fn open(sink: &'a mut dyn Sink, archive: &Path) -> Result<Self> {
        sink.open(archive)?;
        Ok(Self {
            sink,
            closed: false,
        })
    }

    pub fn accept(&mut self, record: &Record, publication: &str) -> Result<()> {
        self.sink.accept(record, publication)
    }

    /// Close the sink with the archive's final outcome.
    pub fn finish(mut self, outcome: ArchiveOutcome) -> Result<()> {
        self.closed = true;
        self.sink.close(outcome)
    }
}

impl Drop for SinkSession<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.sink.close(ArchiveOutcome::Aborted) {
            tracing::warn!("Error closing {} sink: {}", self.sink.name(), e);
        }
    }
}
