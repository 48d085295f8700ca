//! File-tree sink: one `metadata.json` per record.
//!
//! Layout: `<output_root>/<publication>/<doi>/metadata.json`, where both
//! segments have spaces and slashes replaced by underscores. Writing the same
//! record again overwrites the file with identical bytes.

use super::{ArchiveOutcome, Sink};
use crate::{Error, Result};
use crossref_core::Record;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SINK_NAME: &str = "files";

/// File written inside each record's directory.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Configuration for [`FileTreeSink`].
#[derive(Debug, Clone)]
pub struct FileTreeConfig {
    /// Directory under which publication directories are created.
    pub output_root: PathBuf,
    /// Log a progress line every N written records (0 disables).
    pub progress_interval: u64,
}

impl Default for FileTreeConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("./output"),
            progress_interval: 1000,
        }
    }
}

/// Replace path-unsafe characters (space, slash) with underscores.
pub fn sanitize_segment(raw: &str) -> String {
    raw.replace([' ', '/'], "_")
}

/// Relative path of a record's metadata file under the output root.
///
/// Returns `None` when either sanitized segment would not name a directory
/// of its own (empty, `.` or `..`).
pub fn relative_path(publication: &str, doi: &str) -> Option<PathBuf> {
    let publication = sanitize_segment(publication);
    let doi = sanitize_segment(doi);
    if !is_plain_segment(&publication) || !is_plain_segment(&doi) {
        return None;
    }
    Some(
        PathBuf::from(publication)
            .join(doi)
            .join(METADATA_FILE_NAME),
    )
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".."
}

/// Writes each matched record to its own pretty-printed JSON file.
pub struct FileTreeSink {
    config: FileTreeConfig,
    archive_written: u64,
    total_written: u64,
}

impl FileTreeSink {
    pub fn new(config: FileTreeConfig) -> Self {
        Self {
            config,
            archive_written: 0,
            total_written: 0,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.config.output_root
    }

    /// Files written since construction.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    fn write_error(path: &Path, e: impl std::fmt::Display) -> Error {
        Error::SinkWrite {
            sink: SINK_NAME,
            reason: format!("{}: {}", path.display(), e),
        }
    }
}

impl Sink for FileTreeSink {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    fn open(&mut self, _archive: &Path) -> Result<()> {
        self.archive_written = 0;
        Ok(())
    }

    fn accept(&mut self, record: &Record, publication: &str) -> Result<()> {
        let doi = crossref_core::doi(record).ok_or_else(|| Error::MissingIdentifier {
            publication: publication.to_string(),
        })?;

        let relative = relative_path(publication, doi).ok_or_else(|| Error::SinkWrite {
            sink: SINK_NAME,
            reason: format!(
                "publication '{}' with DOI '{}' does not map to a directory",
                publication, doi
            ),
        })?;
        let path = self.config.output_root.join(relative);

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| Self::write_error(dir, e))?;
        }
        let body = serde_json::to_vec_pretty(record).map_err(|e| Self::write_error(&path, e))?;
        fs::write(&path, body).map_err(|e| Self::write_error(&path, e))?;
        debug!("Wrote {}", path.display());

        self.archive_written += 1;
        self.total_written += 1;
        let interval = self.config.progress_interval;
        if interval > 0 && self.total_written % interval == 0 {
            info!(
                "Progress: {} metadata files written under {}",
                self.total_written,
                self.config.output_root.display()
            );
        }
        Ok(())
    }

    fn close(&mut self, outcome: ArchiveOutcome) -> Result<()> {
        if outcome == ArchiveOutcome::Aborted && self.archive_written > 0 {
            // Files already written stay on disk; a rerun overwrites them.
            warn!(
                "Archive aborted after writing {} metadata files",
                self.archive_written
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sink_in(dir: &TempDir) -> FileTreeSink {
        FileTreeSink::new(FileTreeConfig {
            output_root: dir.path().to_path_buf(),
            progress_interval: 1,
        })
    }

    // =========================================================================
    // Sanitization
    // =========================================================================

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("Human Genetics"), "Human_Genetics");
        assert_eq!(sanitize_segment("10.1038/s41525"), "10.1038_s41525");
        assert_eq!(sanitize_segment("a / b"), "a___b");
        assert_eq!(sanitize_segment("plain"), "plain");
    }

    #[test]
    fn test_relative_path_layout() {
        let path = relative_path(
            "Human Genetics and Genomic Advances",
            "10.1038/s41525-020-0123-4",
        )
        .unwrap();
        assert_eq!(
            path,
            PathBuf::from(
                "Human_Genetics_and_Genomic_Advances/10.1038_s41525-020-0123-4/metadata.json"
            )
        );
    }

    #[test]
    fn test_relative_path_rejects_dot_segments() {
        assert!(relative_path("..", "10.1/a").is_none());
        assert!(relative_path("Heredity", ".").is_none());
        assert!(relative_path("", "10.1/a").is_none());
    }

    // =========================================================================
    // Writing
    // =========================================================================

    #[test]
    fn test_writes_pretty_json_at_layout_path() {
        let dir = TempDir::new().unwrap();
        let mut sink = sink_in(&dir);
        let record = json!({
            "DOI": "10.1038/s41525-020-0123-4",
            "container-title": ["Human Genetics and Genomic Advances"],
        });

        sink.accept(&record, "Human Genetics and Genomic Advances")
            .unwrap();

        let path = dir
            .path()
            .join("Human_Genetics_and_Genomic_Advances")
            .join("10.1038_s41525-020-0123-4")
            .join(METADATA_FILE_NAME);
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.contains('\n'));
        let parsed: Record = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(sink.total_written(), 1);
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let mut sink = sink_in(&dir);
        let record = json!({"DOI": "10.1/abc", "title": ["Same"], "page": "1-2"});

        sink.accept(&record, "Heredity").unwrap();
        let path = dir.path().join("Heredity/10.1_abc").join(METADATA_FILE_NAME);
        let first = fs::read(&path).unwrap();

        sink.accept(&record, "Heredity").unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_overwrites_previous_content() {
        let dir = TempDir::new().unwrap();
        let mut sink = sink_in(&dir);

        sink.accept(&json!({"DOI": "10.1/abc", "v": 1}), "Heredity")
            .unwrap();
        sink.accept(&json!({"DOI": "10.1/abc", "v": 2}), "Heredity")
            .unwrap();

        let path = dir.path().join("Heredity/10.1_abc").join(METADATA_FILE_NAME);
        let parsed: Record = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        assert_eq!(parsed["v"], 2);
    }

    #[test]
    fn test_missing_doi_skips_record_only() {
        let dir = TempDir::new().unwrap();
        let mut sink = sink_in(&dir);

        let err = sink
            .accept(&json!({"container-title": ["Heredity"]}), "Heredity")
            .unwrap_err();
        assert!(matches!(err, Error::MissingIdentifier { ref publication } if publication == "Heredity"));
        assert!(err.is_record_scoped());
        assert!(!dir.path().join("Heredity").exists());

        sink.accept(&json!({"DOI": "10.1/ok"}), "Heredity").unwrap();
        assert!(dir
            .path()
            .join("Heredity/10.1_ok")
            .join(METADATA_FILE_NAME)
            .exists());
    }

    #[test]
    fn test_empty_doi_is_missing() {
        let dir = TempDir::new().unwrap();
        let mut sink = sink_in(&dir);

        let err = sink.accept(&json!({"DOI": ""}), "Heredity").unwrap_err();
        assert!(matches!(err, Error::MissingIdentifier { .. }));
    }

    #[test]
    fn test_unwritable_root_is_record_scoped() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let mut sink = FileTreeSink::new(FileTreeConfig {
            output_root: blocker,
            progress_interval: 0,
        });

        let err = sink.accept(&json!({"DOI": "10.1/a"}), "Heredity").unwrap_err();
        assert!(matches!(err, Error::SinkWrite { sink: "files", .. }));
        assert!(!err.is_fatal());
    }
}
