//! Console sink: one compact JSON object per line.

use super::Sink;
use crate::{Error, Result};
use crossref_core::Record;
use std::io::{self, StdoutLock, Write};

const SINK_NAME: &str = "console";

/// Writes each matched record as a single line of compact JSON.
///
/// Every line is flushed immediately so downstream pipes see records as they
/// are matched. Output is not valid as a single JSON document.
pub struct ConsoleSink<W: Write> {
    writer: W,
    written: u64,
}

impl ConsoleSink<StdoutLock<'static>> {
    pub fn stdout() -> Self {
        Self::new(io::stdout().lock())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Records emitted so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, record: &Record) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> Sink for ConsoleSink<W> {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    fn accept(&mut self, record: &Record, _publication: &str) -> Result<()> {
        // A broken pipe or closed stdout will not recover for the next record.
        self.write_line(record).map_err(|e| Error::SinkUnavailable {
            sink: SINK_NAME,
            reason: e.to_string(),
        })?;
        self.written += 1;
        Ok(())
    }
}
