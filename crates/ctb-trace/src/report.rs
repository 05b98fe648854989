//! Analysis report

use crate::aggregate::CandidateAggregate;
use crate::engine::EngineConfig;
use crate::skip::SkipRecord;
use serde::Serialize;

/// Thresholds in force for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    pub tombstone_threshold: u64,
    pub time_threshold_us: u64,
    pub result_cap: usize,
}

impl From<&EngineConfig> for Thresholds {
    fn from(config: &EngineConfig) -> Self {
        Self {
            tombstone_threshold: config.tombstone_threshold,
            time_threshold_us: config.time_threshold_us,
            result_cap: config.result_cap,
        }
    }
}

/// Row counters gathered while scanning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub sessions_scanned: u64,
    pub below_time_threshold: u64,
    pub candidates: u64,
    pub events_scanned: u64,
    pub events_matched: u64,
    pub malformed_events: u64,
    pub below_tombstone_threshold: u64,
    pub locality_violations: u64,
}

/// Result of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Qualifying sessions, slowest first
    pub ranked: Vec<CandidateAggregate>,

    /// Aggregates that passed both thresholds, before the result cap
    pub satisfying_criteria: u64,

    pub skipped_null_duration: u64,
    pub skipped_errors: Vec<SkipRecord>,

    /// Set when the run was cancelled before both scans completed
    pub is_partial: bool,

    pub thresholds: Thresholds,
    pub scan: ScanStats,
    pub pattern_version: String,
    pub elapsed_ms: u64,
}

impl Report {
    pub fn skipped_error_count(&self) -> usize {
        self.skipped_errors.len()
    }
}
