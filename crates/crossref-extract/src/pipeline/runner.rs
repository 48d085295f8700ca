//! Drives one archive through decoder, predicate and sink.

use crate::archive::ArchiveDecoder;
use crate::sink::{ArchiveOutcome, Sink, SinkSession};
use crate::Result;
use crossref_core::metrics::{increment, record_archive};
use crossref_core::{TargetLookup, evaluate};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Per-archive lifecycle.
///
/// `Idle → Opening → Streaming → (Done | Aborted)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    Idle,
    Opening,
    Streaming,
    /// The decoder reported exhaustion.
    Done,
    /// A malformed record ended the archive early.
    Aborted,
}

impl ArchiveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveState::Idle => "idle",
            ArchiveState::Opening => "opening",
            ArchiveState::Streaming => "streaming",
            ArchiveState::Done => "done",
            ArchiveState::Aborted => "aborted",
        }
    }

    fn outcome(&self) -> ArchiveOutcome {
        match self {
            ArchiveState::Done => ArchiveOutcome::Done,
            _ => ArchiveOutcome::Aborted,
        }
    }
}

impl std::fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record counts for one archive (or a whole walk).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    /// Records decoded.
    pub attempted: u64,
    /// Records whose publication is a target.
    pub matched: u64,
    /// Matched records accepted by the sink.
    pub written: u64,
    /// Matched records the sink rejected.
    pub skipped: u64,
}

impl RecordCounts {
    pub fn add(&mut self, other: &RecordCounts) {
        self.attempted += other.attempted;
        self.matched += other.matched;
        self.written += other.written;
        self.skipped += other.skipped;
    }
}

/// Result of running one archive.
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub archive: PathBuf,
    pub state: ArchiveState,
    pub counts: RecordCounts,
    /// The decode error that aborted the archive, if any.
    pub decode_error: Option<String>,
}

impl ArchiveReport {
    fn new(archive: &Path) -> Self {
        Self {
            archive: archive.to_path_buf(),
            state: ArchiveState::Idle,
            counts: RecordCounts::default(),
            decode_error: None,
        }
    }
}

/// Composes decoder, predicate and sink for one archive at a time.
///
/// Failure policy:
/// - archive open and envelope errors return `Err` before the sink is opened
/// - a malformed record ends the archive (`Aborted`) and returns `Ok`
/// - record-scoped sink errors are logged and the record is skipped
/// - fatal sink errors close the sink as aborted and return `Err`
pub struct Runner<'a> {
    targets: &'a dyn TargetLookup,
    sink: &'a mut dyn Sink,
}

impl<'a> Runner<'a> {
    pub fn new(targets: &'a dyn TargetLookup, sink: &'a mut dyn Sink) -> Self {
        Self { targets, sink }
    }

    /// Run one archive file.
    pub fn run(&mut self, path: &Path) -> Result<ArchiveReport> {
        info!("Processing archive: {}", path.display());
        let mut report = ArchiveReport::new(path);
        report.state = ArchiveState::Opening;

        if let Ok(meta) = std::fs::metadata(path) {
            increment("extract_archive_bytes_total", meta.len());
        }
        let decoder = ArchiveDecoder::open(path)?;
        self.drain(decoder, report)
    }

    /// Run an already-opened decoder (envelope validated).
    pub fn run_decoder<R: BufRead>(
        &mut self,
        path: &Path,
        decoder: ArchiveDecoder<R>,
    ) -> Result<ArchiveReport> {
        let mut report = ArchiveReport::new(path);
        report.state = ArchiveState::Opening;
        self.drain(decoder, report)
    }

    fn drain<R: BufRead>(
        &mut self,
        mut decoder: ArchiveDecoder<R>,
        mut report: ArchiveReport,
    ) -> Result<ArchiveReport> {
        let mut session = SinkSession::open(&mut *self.sink, &report.archive)?;
        report.state = ArchiveState::Streaming;
        let counts = &mut report.counts;

        while let Some(item) = decoder.next() {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    warn!("{}", e);
                    increment("extract_decode_errors_total", 1);
                    report.decode_error = Some(e.to_string());
                    report.state = ArchiveState::Aborted;
                    break;
                }
            };
            counts.attempted += 1;

            let Some(publication) = evaluate(&record, self.targets).publication() else {
                continue;
            };
            counts.matched += 1;

            match session.accept(&record, publication) {
                Ok(()) => counts.written += 1,
                Err(e) if e.is_fatal() => {
                    flush_counts(counts);
                    record_archive("failed");
                    // Dropping the session closes the sink as aborted.
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "{} record {}: {}",
                        decoder.name(),
                        decoder.position().saturating_sub(1),
                        e
                    );
                    counts.skipped += 1;
                }
            }
        }

        if report.state == ArchiveState::Streaming {
            report.state = ArchiveState::Done;
        }
        session.finish(report.state.outcome())?;

        flush_counts(&report.counts);
        record_archive(report.state.as_str());
        info!(
            "Archive {} {}: attempted={} matched={} written={} skipped={}",
            report.archive.display(),
            report.state,
            report.counts.attempted,
            report.counts.matched,
            report.counts.written,
            report.counts.skipped
        );
        Ok(report)
    }
}

fn flush_counts(counts: &RecordCounts) {
    increment("extract_records_total", counts.attempted);
    increment("extract_records_matched_total", counts.matched);
    increment("extract_records_written_total", counts.written);
    increment("extract_records_skipped_total", counts.skipped);
}
