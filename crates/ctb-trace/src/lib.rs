//! Trace session analysis
//!
//! Joins `system_traces.sessions` with `system_traces.events`, derives
//! tombstone counts and behavioral flags per session, and ranks the slowest
//! qualifying sessions.
//!
//! - [`TraceEngine`]: two-phase session/event aggregation
//! - [`FlagClassifier`]: versioned activity pattern table
//! - [`tombstones::tally`]: tombstone count for one event
//! - [`TopK`]: bounded ranking by duration
//! - [`SkipTracker`]: null-duration and decode-error bookkeeping

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod flags;
pub mod report;
pub mod skip;
pub mod tombstones;
pub mod topk;

pub use aggregate::CandidateAggregate;
pub use engine::{CancelToken, EngineConfig, TraceEngine};
pub use error::{ClassifierError, EngineError};
pub use flags::{Flag, FlagClassifier, FlagSet};
pub use report::{Report, ScanStats, Thresholds};
pub use skip::{SkipReason, SkipRecord, SkipTracker};
pub use topk::TopK;
