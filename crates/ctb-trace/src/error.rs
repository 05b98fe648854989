//! Error types for trace analysis

use ctb_core::SourceError;
use thiserror::Error;

/// Errors building a flag classifier
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    #[error("Invalid pattern for {flag}: {source}")]
    Pattern {
        flag: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors that abort an analysis run
#[derive(Debug, Error)]
pub enum EngineError {
    /// The row source could not produce further rows
    #[error("Row source failed: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

pub type EngineResult<T> = Result<T, EngineError>;
