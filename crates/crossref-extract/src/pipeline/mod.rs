//! Decode → filter → sink, per archive and across a directory tree.

mod runner;
mod walker;

pub use runner::{ArchiveReport, ArchiveState, RecordCounts, Runner};
pub use walker::{DEFAULT_SUFFIX, WalkReport, Walker, WalkerConfig};
