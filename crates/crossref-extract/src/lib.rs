//! Streaming extraction of target-journal records from Crossref dumps.
//!
//! # Modules
//!
//! - [`archive`] - Pull-based decoder for gzip `{"items": [...]}` archives
//! - [`sink`] - Destinations for matched records (console, file tree, SQLite)
//! - [`pipeline`] - Per-archive runner and the directory walker
//! - [`catalog`] - The persisted `journals` target table
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │     Walker      │  walkdir, suffix filter, per-archive error policy
//! └────────┬────────┘
//!          │  one archive at a time
//!          ▼
//! ┌─────────────────┐
//! │ ArchiveDecoder  │  gzip → envelope → one record per pull
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Predicate    │  first container-title ∈ target set
//! └────────┬────────┘
//!          │  matches only
//!          ▼
//! ┌─────────────────┐
//! │      Sink       │  stdout / metadata.json tree / SQLite articles
//! └─────────────────┘
//! ```
//!
//! Records stay ordered within an archive; archives run sequentially.

pub mod archive;
pub mod catalog;
pub mod error;
pub mod pipeline;
pub mod sink;

pub use error::{Error, Result};

pub use archive::ArchiveDecoder;

pub use pipeline::{
    ArchiveReport, ArchiveState, RecordCounts, Runner, WalkReport, Walker, WalkerConfig,
};

pub use sink::{
    ArchiveOutcome, ConsoleSink, FileTreeConfig, FileTreeSink, Sink, SinkSession, SqliteSink,
    SqliteSinkConfig,
};
