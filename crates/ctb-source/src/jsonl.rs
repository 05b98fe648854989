//! JSON-lines row source
//!
//! Reads the output of `cqlsh -e "SELECT JSON * FROM system_traces.sessions"`
//! (and `.events`), one row object per line. cqlsh decorations (the `[json]`
//! header, the dashed separator and the `(N rows)` footer), blank lines and
//! `#` comments are skipped.

use crate::decode::{decode_event, decode_session};
use ctb_core::{
    EventRow, RowDecodeError, RowError, RowResult, RowSource, RowStream, SessionRow, SourceError,
    TimestampEncoding,
};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Row source backed by two JSONL exports
#[derive(Debug, Clone)]
pub struct JsonlRowSource {
    sessions_path: PathBuf,
    events_path: PathBuf,
    encoding: TimestampEncoding,
}

impl JsonlRowSource {
    pub fn new(sessions_path: impl Into<PathBuf>, events_path: impl Into<PathBuf>) -> Self {
        Self {
            sessions_path: sessions_path.into(),
            events_path: events_path.into(),
            encoding: TimestampEncoding::Native,
        }
    }

    /// Set the backend timestamp encoding
    pub fn with_encoding(mut self, encoding: TimestampEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    fn open(stream: &'static str, path: &Path) -> Result<BufReader<File>, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Open {
            stream,
            location: path.display().to_string(),
            source,
        })?;
        info!("Scanning {} from {}", stream, path.display());
        Ok(BufReader::new(file))
    }
}

impl RowSource for JsonlRowSource {
    fn describe(&self) -> String {
        format!(
            "jsonl(sessions={}, events={}, encoding={})",
            self.sessions_path.display(),
            self.events_path.display(),
            self.encoding
        )
    }

    fn scan_sessions(&mut self) -> Result<RowStream<'_, SessionRow>, SourceError> {
        let reader = Self::open("sessions", &self.sessions_path)?;
        let encoding = self.encoding;
        Ok(Box::new(JsonlRows::new("sessions", reader, move |value, line| {
            decode_session(value, encoding, line)
        })))
    }

    fn scan_events(&mut self) -> Result<RowStream<'_, EventRow>, SourceError> {
        let reader = Self::open("events", &self.events_path)?;
        Ok(Box::new(JsonlRows::new("events", reader, decode_event)))
    }
}

/// Iterator adapter turning JSONL lines into decoded rows
///
/// Lines are read as raw bytes so that a line which is not valid UTF-8 is a
/// row error and does not end the stream.
struct JsonlRows<R, F> {
    stream: &'static str,
    reader: R,
    buf: Vec<u8>,
    line_number: u64,
    failed: bool,
    decode: F,
}

impl<R, F> JsonlRows<R, F> {
    fn new(stream: &'static str, reader: R, decode: F) -> Self {
        Self {
            stream,
            reader,
            buf: Vec::new(),
            line_number: 0,
            failed: false,
            decode,
        }
    }
}

fn is_decoration(line: &str) -> bool {
    line.is_empty()
        || line.starts_with('#')
        || line == "[json]"
        || line.starts_with("---")
        || (line.starts_with('(') && line.ends_with(')') && line.contains("row"))
}

impl<R, F, T> Iterator for JsonlRows<R, F>
where
    R: BufRead,
    F: FnMut(Value, u64) -> Result<T, RowDecodeError>,
{
    type Item = RowResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        // An I/O error ends the stream
        if self.failed {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    self.failed = true;
                    return Some(Err(RowError::Stream(SourceError::Io {
                        stream: self.stream,
                        source,
                    })));
                }
            }
            self.line_number += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim(),
                Err(err) => {
                    debug!("Undecodable {} line {}", self.stream, self.line_number);
                    return Some(Err(RowDecodeError::new(
                        format!("line {}", self.line_number),
                        format!("invalid UTF-8: {}", err),
                    )
                    .into()));
                }
            };
            if is_decoration(line) {
                continue;
            }

            let value: Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(err) => {
                    debug!("Unparseable {} line {}: {}", self.stream, self.line_number, line);
                    return Some(Err(RowDecodeError::new(
                        format!("line {}", self.line_number),
                        format!("invalid JSON: {}", err),
                    )
                    .into()));
                }
            };

            return Some((self.decode)(value, self.line_number).map_err(RowError::from));
        }
    }
}
