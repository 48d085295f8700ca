//! Archive discovery and the per-archive error policy.

use super::runner::{ArchiveReport, ArchiveState, RecordCounts, Runner};
use crate::{Error, Result};
use crossref_core::metrics::record_archive;
use std::path::PathBuf;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Default archive file suffix.
pub const DEFAULT_SUFFIX: &str = ".json.gz";

/// Configuration for the archive walker.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Directory to scan recursively, or a single archive file.
    pub root: PathBuf,

    /// Only files whose name ends with this suffix are processed.
    pub suffix: String,

    /// Stop after this many archives.
    pub limit: Option<usize>,

    /// Visit entries in file-name order instead of filesystem order.
    pub sorted: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            suffix: DEFAULT_SUFFIX.to_string(),
            limit: None,
            sorted: false,
        }
    }
}

/// Totals for one walk.
#[derive(Debug, Clone, Default)]
pub struct WalkReport {
    /// Archives handed to the runner.
    pub archives_seen: usize,
    pub archives_done: usize,
    pub archives_aborted: usize,
    /// Archives that could not be opened or had a bad envelope.
    pub archives_failed: usize,
    pub counts: RecordCounts,
}

impl WalkReport {
    fn record(&mut self, report: &ArchiveReport) {
        match report.state {
            ArchiveState::Done => self.archives_done += 1,
            _ => self.archives_aborted += 1,
        }
        self.counts.add(&report.counts);
    }
}

/// Walks a directory tree and runs every matching archive.
pub struct Walker {
    config: WalkerConfig,
}

impl Walker {
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    fn is_archive(&self, path: &std::path::Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&self.config.suffix))
    }

    /// Run every archive under the root.
    ///
    /// Per-archive failures are logged and counted. Only an unreadable root
    /// or a fatal sink error ends the walk with `Err`.
    pub fn run(&self, runner: &mut Runner<'_>) -> Result<WalkReport> {
        let root = &self.config.root;
        let mut report = WalkReport::default();

        let mut walk = WalkDir::new(root);
        if self.config.sorted {
            walk = walk.sort_by_file_name();
        }

        for entry in walk {
            if self
                .config
                .limit
                .is_some_and(|limit| report.archives_seen >= limit)
            {
                info!("Reached archive limit ({})", report.archives_seen);
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(Error::Enumeration {
                        root: root.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            // A single-file root is processed whatever its name.
            let is_root = entry.depth() == 0;
            if !entry.file_type().is_file() || (!is_root && !self.is_archive(entry.path())) {
                continue;
            }

            report.archives_seen += 1;
            match runner.run(entry.path()) {
                Ok(archive) => report.record(&archive),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Skipping archive {}: {}", entry.path().display(), e);
                    record_archive("failed");
                    report.archives_failed += 1;
                }
            }
        }

        info!(
            "Walk complete: {} archives ({} done, {} aborted, {} failed), {} records, {} matched, {} written, {} skipped",
            report.archives_seen,
            report.archives_done,
            report.archives_aborted,
            report.archives_failed,
            report.counts.attempted,
            report.counts.matched,
            report.counts.written,
            report.counts.skipped
        );
        Ok(report)
    }
}
