//! Pull-based decoder for `{"items": [...]}` archives.
//!
//! The envelope is validated token by token, then each array element is
//! captured as raw bytes (tracking string and bracket state) and parsed on
//! its own. Memory stays bounded by the read buffer plus one record.

use crate::{Error, Result};
use crossref_core::Record;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::Path;

/// Decompressed read buffer size.
const READ_BUFFER_SIZE: usize = 1024 * 1024; // 1MB

/// Upper bound for a single captured element.
///
/// An unterminated string in a corrupt archive would otherwise pull the rest
/// of the stream into memory.
pub const MAX_RECORD_BYTES: usize = 64 * 1024 * 1024; // 64MB

/// The only envelope key the decoder reads.
const ITEMS_KEY: &str = "items";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Streaming,
    Exhausted,
    Failed,
}

/// Lazy, non-restartable sequence of records from one archive.
pub struct ArchiveDecoder<R> {
    name: String,
    reader: R,
    /// Ordinal of the next element within `items`.
    position: usize,
    /// Reusable capture buffer for the current element.
    buf: Vec<u8>,
    state: DecoderState,
}

impl ArchiveDecoder<Box<dyn BufRead>> {
    /// Open an archive file.
    ///
    /// Files ending in `.gz` are decompressed (concatenated gzip members are
    /// accepted). The first decompressed block is read here, so a file that
    /// is not gzip fails with [`Error::ArchiveFormat`] before any record is
    /// requested.
    pub fn open(path: &Path) -> Result<Self> {
        let archive_error = |source| Error::ArchiveFormat {
            archive: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(archive_error)?;
        let is_gzip = path.extension().is_some_and(|ext| ext == "gz");

        let mut reader: Box<dyn BufRead> = if is_gzip {
            Box::new(BufReader::with_capacity(
                READ_BUFFER_SIZE,
                MultiGzDecoder::new(BufReader::new(file)),
            ))
        } else {
            Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file))
        };

        reader.fill_buf().map_err(archive_error)?;

        Self::new(path.display().to_string(), reader)
    }
}

impl<R: BufRead> ArchiveDecoder<R> {
    /// Wrap an already-decompressed stream and validate its envelope.
    ///
    /// Consumes `{`, the `"items"` key, `:` and `[`; anything else is an
    /// [`Error::Envelope`].
    pub fn new(name: impl Into<String>, reader: R) -> Result<Self> {
        let mut decoder = Self {
            name: name.into(),
            reader,
            position: 0,
            buf: Vec::with_capacity(16 * 1024),
            state: DecoderState::Streaming,
        };

        if let Err(reason) = decoder.read_envelope() {
            return Err(Error::Envelope {
                archive: decoder.name,
                reason,
            });
        }

        Ok(decoder)
    }

    /// Archive name used in error context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of records decoded so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// True while another element remains in `items`.
    ///
    /// Returns `false` at the closing `]` or at end of input; content after
    /// the array is never inspected.
    pub fn has_more(&mut self) -> Result<bool> {
        if self.state != DecoderState::Streaming {
            return Ok(false);
        }

        match self.skip_whitespace() {
            Ok(None) | Ok(Some(b']')) => {
                self.state = DecoderState::Exhausted;
                Ok(false)
            }
            Ok(Some(_)) => Ok(true),
            Err(e) => Err(self.fail(e.to_string())),
        }
    }

    /// Decode exactly one element into a generic record.
    ///
    /// On failure the decoder stops: the stream position after a malformed
    /// fragment cannot be trusted, so later calls report no more records.
    pub fn decode_next(&mut self) -> Result<Record> {
        if !self.has_more()? {
            return Err(Error::RecordDecode {
                archive: self.name.clone(),
                position: self.position,
                reason: "no more records in items array".to_string(),
            });
        }

        match self.read_element() {
            Ok(record) => {
                self.position += 1;
                Ok(record)
            }
            Err(reason) => Err(self.fail(reason)),
        }
    }

    fn fail(&mut self, reason: String) -> Error {
        self.state = DecoderState::Failed;
        Error::RecordDecode {
            archive: self.name.clone(),
            position: self.position,
            reason,
        }
    }

    // ------------------------------------------------------------------
    // Envelope
    // ------------------------------------------------------------------

    fn read_envelope(&mut self) -> std::result::Result<(), String> {
        self.expect_token(b'{', "opening '{'")?;

        match self.skip_whitespace().map_err(|e| e.to_string())? {
            Some(b'"') => {}
            Some(b) => return Err(format!("expected items key, found '{}'", b as char)),
            None => return Err("expected items key, found end of input".to_string()),
        }
        self.capture_delimited()?;
        let key: String = serde_json::from_slice(&self.buf)
            .map_err(|e| format!("invalid object key: {}", e))?;
        if key != ITEMS_KEY {
            return Err(format!("expected '{}' key, got '{}'", ITEMS_KEY, key));
        }

        self.expect_token(b':', "':' after items key")?;
        self.expect_token(b'[', "opening '[' of items array")?;
        Ok(())
    }

    fn expect_token(&mut self, expected: u8, what: &str) -> std::result::Result<(), String> {
        match self.skip_whitespace().map_err(|e| e.to_string())? {
            Some(b) if b == expected => {
                self.reader.consume(1);
                Ok(())
            }
            Some(b) => Err(format!("expected {}, found '{}'", what, b as char)),
            None => Err(format!("expected {}, found end of input", what)),
        }
    }

    // ------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------

    fn read_element(&mut self) -> std::result::Result<Record, String> {
        if self.position > 0 {
            match self.skip_whitespace().map_err(|e| e.to_string())? {
                Some(b',') => self.reader.consume(1),
                Some(b) => {
                    return Err(format!("expected ',' between records, found '{}'", b as char));
                }
                None => return Err("unexpected end of input".to_string()),
            }
        }

        match self.skip_whitespace().map_err(|e| e.to_string())? {
            Some(b'{' | b'[' | b'"') => self.capture_delimited()?,
            Some(_) => self.capture_scalar()?,
            None => return Err("unexpected end of input".to_string()),
        }

        serde_json::from_slice(&self.buf).map_err(|e| e.to_string())
    }

    /// Capture one object, array, or string into `buf`.
    fn capture_delimited(&mut self) -> std::result::Result<(), String> {
        self.buf.clear();
        let mut scan = Scan::default();

        loop {
            let chunk = self.reader.fill_buf().map_err(|e| e.to_string())?;
            if chunk.is_empty() {
                return Err("unexpected end of input inside record".to_string());
            }

            let (consumed, done) = scan.feed(chunk);
            self.buf.extend_from_slice(&chunk[..consumed]);
            self.reader.consume(consumed);

            if done {
                return Ok(());
            }
            if self.buf.len() > MAX_RECORD_BYTES {
                return Err(format!("record exceeds {} bytes", MAX_RECORD_BYTES));
            }
        }
    }

    /// Capture a bare scalar (number, `true`, `false`, `null`) into `buf`.
    fn capture_scalar(&mut self) -> std::result::Result<(), String> {
        self.buf.clear();

        loop {
            let chunk = self.reader.fill_buf().map_err(|e| e.to_string())?;
            if chunk.is_empty() {
                return Ok(());
            }

            let end = chunk
                .iter()
                .position(|&b| is_scalar_delimiter(b))
                .unwrap_or(chunk.len());
            let len = chunk.len();
            self.buf.extend_from_slice(&chunk[..end]);
            self.reader.consume(end);

            if end < len {
                return Ok(());
            }
            if self.buf.len() > MAX_RECORD_BYTES {
                return Err(format!("record exceeds {} bytes", MAX_RECORD_BYTES));
            }
        }
    }

    /// Skip JSON whitespace and peek at the next byte.
    fn skip_whitespace(&mut self) -> io::Result<Option<u8>> {
        loop {
            let chunk = self.reader.fill_buf()?;
            if chunk.is_empty() {
                return Ok(None);
            }

            match chunk.iter().position(|&b| !is_whitespace(b)) {
                Some(idx) => {
                    let next = chunk[idx];
                    self.reader.consume(idx);
                    return Ok(Some(next));
                }
                None => {
                    let len = chunk.len();
                    self.reader.consume(len);
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for ArchiveDecoder<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_more() {
            Ok(true) => Some(self.decode_next()),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: BufRead> FusedIterator for ArchiveDecoder<R> {}

/// Structural state while capturing a delimited value.
#[derive(Default)]
struct Scan {
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Scan {
    /// Advance over `chunk`; returns bytes consumed and whether the value closed.
    fn feed(&mut self, chunk: &[u8]) -> (usize, bool) {
        for (idx, &b) in chunk.iter().enumerate() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                    if self.depth == 0 {
                        return (idx + 1, true);
                    }
                }
                continue;
            }

            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return (idx + 1, true);
                    }
                }
                _ => {}
            }
        }
        (chunk.len(), false)
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_scalar_delimiter(b: u8) -> bool {
    is_whitespace(b) || matches!(b, b',' | b']' | b'}')
}
