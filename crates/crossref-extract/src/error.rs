//! Error types for the extraction pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during extraction.
///
/// Scope matters more than kind here: see [`Error::is_fatal`].
#[derive(Error, Debug)]
pub enum Error {
    /// The archive file could not be read or is not a valid compressed stream.
    #[error("cannot read archive {}: {source}", archive.display())]
    ArchiveFormat {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive does not start with `{"items": [`.
    #[error("envelope error in {archive}: {reason}")]
    Envelope { archive: String, reason: String },

    /// One array element could not be decoded; the rest of the archive is dropped.
    #[error("record decode error in {archive} at record {position}: {reason}")]
    RecordDecode {
        archive: String,
        /// 0-based ordinal of the element within `items`.
        position: usize,
        reason: String,
    },

    /// A matched record has no usable DOI for the file-tree layout.
    #[error("record from '{publication}' has no DOI")]
    MissingIdentifier { publication: String },

    /// A sink rejected one record; the run continues.
    #[error("{sink} sink failed to write record: {reason}")]
    SinkWrite { sink: &'static str, reason: String },

    /// A sink can no longer accept records; the run stops.
    #[error("{sink} sink unavailable: {reason}")]
    SinkUnavailable { sink: &'static str, reason: String },

    /// The walk root could not be enumerated.
    #[error("cannot enumerate {}: {reason}", root.display())]
    Enumeration { root: PathBuf, reason: String },

    /// SQLite error outside of record inserts (schema, catalog edits).
    #[error("database error: {0}")]
    Database(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the shared core crate.
    #[error(transparent)]
    Core(#[from] crossref_core::Error),
}

impl Error {
    /// True if the whole invocation must stop.
    ///
    /// Everything else is scoped to one record or one archive and is logged
    /// by the runner or walker.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::SinkUnavailable { .. } | Error::Enumeration { .. }
        )
    }

    /// True if the error concerns a single record and the archive can continue.
    pub fn is_record_scoped(&self) -> bool {
        matches!(
            self,
            Error::MissingIdentifier { .. } | Error::SinkWrite { .. }
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Database(e.to_string())
    }
}
