//! Row source traits
//!
//! A row source supplies two lazy, finite streams: session rows and event
//! rows. Each stream distinguishes a recoverable per-row decode failure from
//! a fatal stream failure.

use crate::rows::{EventRow, SessionRow};
use thiserror::Error;

/// Fatal row source failure (the stream cannot produce further rows)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to open {stream} stream at {location}: {source}")]
    Open {
        stream: &'static str,
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while reading {stream} stream: {source}")]
    Io {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Row source unavailable: {0}")]
    Unavailable(String),
}

/// A single row that could not be decoded
///
/// `session_id` is the best identity available for the row: the parsed
/// UUID, the raw id text when it does not parse, or the line position when
/// the row itself is unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to decode row for session {session_id}: {message}")]
pub struct RowDecodeError {
    pub session_id: String,
    pub message: String,
}

impl RowDecodeError {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
        }
    }
}

/// Error yielded by a row stream
#[derive(Debug, Error)]
pub enum RowError {
    /// Recoverable: skip the row and keep scanning
    #[error(transparent)]
    Decode(#[from] RowDecodeError),

    /// Fatal: abort the scan
    #[error(transparent)]
    Stream(#[from] SourceError),
}

pub type RowResult<T> = Result<T, RowError>;

/// Lazy sequence of rows borrowed from a source
pub type RowStream<'a, T> = Box<dyn Iterator<Item = RowResult<T>> + 'a>;

/// Supplier of trace rows
pub trait RowSource {
    /// Human-readable description for logs
    fn describe(&self) -> String;

    /// Open the `system_traces.sessions` scan
    fn scan_sessions(&mut self) -> Result<RowStream<'_, SessionRow>, SourceError>;

    /// Open the `system_traces.events` scan
    fn scan_events(&mut self) -> Result<RowStream<'_, EventRow>, SourceError>;
}
