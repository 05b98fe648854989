//! Two-phase trace analysis
//!
//! Phase one consumes the session stream and keeps sessions that meet the
//! time threshold as candidates. Phase two consumes the event stream and
//! folds each event into its candidate. Qualifying candidates are then
//! ranked by the Top-K selector.

use crate::aggregate::CandidateAggregate;
use crate::error::{EngineError, EngineResult};
use crate::flags::FlagClassifier;
use crate::report::{Report, ScanStats, Thresholds};
use crate::skip::SkipTracker;
use crate::tombstones;
use crate::topk::TopK;
use ctb_core::config::TracingSettings;
use ctb_core::{RowError, RowSource};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum total tombstones for a session to be reported
    pub tombstone_threshold: u64,

    /// Minimum session duration in microseconds
    pub time_threshold_us: u64,

    /// Maximum number of ranked sessions (0 = unlimited)
    pub result_cap: usize,

    /// Treat each session's events as contiguous in the event stream
    pub partition_locality: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tombstone_threshold: 0,
            time_threshold_us: 10_000,
            result_cap: 100,
            partition_locality: false,
        }
    }
}

impl From<&TracingSettings> for EngineConfig {
    fn from(settings: &TracingSettings) -> Self {
        Self {
            tombstone_threshold: settings.tombstone_threshold,
            time_threshold_us: settings.time_threshold_us,
            result_cap: settings.result_cap,
            partition_locality: settings.partition_locality,
        }
    }
}

/// Cooperative cancellation handle shared with the caller
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Transient state for one run
struct RunState {
    candidates: HashMap<Uuid, CandidateAggregate>,
    skips: SkipTracker,
    top: TopK,
    stats: ScanStats,
    in_flight: Option<Uuid>,
    finalized: HashSet<Uuid>,
}

impl RunState {
    fn new(result_cap: usize) -> Self {
        Self {
            candidates: HashMap::new(),
            skips: SkipTracker::new(),
            top: TopK::new(result_cap),
            stats: ScanStats::default(),
            in_flight: None,
            finalized: HashSet::new(),
        }
    }

    fn finalize(&mut self, aggregate: CandidateAggregate, tombstone_threshold: u64) {
        if aggregate.total_tombstones >= tombstone_threshold {
            self.top.push(aggregate);
        } else {
            self.stats.below_tombstone_threshold += 1;
        }
    }
}

/// Trace analysis engine
pub struct TraceEngine {
    config: EngineConfig,
    classifier: FlagClassifier,
    cancel: CancelToken,
}

impl TraceEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            classifier: FlagClassifier::builtin(),
            cancel: CancelToken::new(),
        }
    }

    /// Build an engine from `[tracing]` settings, including extra flag patterns
    pub fn from_settings(settings: &TracingSettings) -> EngineResult<Self> {
        let classifier =
            FlagClassifier::builtin().with_extra_patterns(&settings.flag_patterns)?;
        Ok(Self::new(EngineConfig::from(settings)).with_classifier(classifier))
    }

    pub fn with_classifier(mut self, classifier: FlagClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Handle that cancels this engine's runs
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyse the rows of `source`
    ///
    /// Fails only when a stream cannot be opened or breaks mid-scan. A
    /// cancelled run returns what was gathered so far, marked partial.
    pub fn run(&self, source: &mut dyn RowSource) -> EngineResult<Report> {
        let started = Instant::now();
        let mut state = RunState::new(self.config.result_cap);

        info!("Analysing traces from {}", source.describe());

        let complete = self.scan_sessions(source, &mut state)?
            && self.scan_events(source, &mut state)?;

        let remaining: Vec<CandidateAggregate> =
            state.candidates.drain().map(|(_, agg)| agg).collect();
        for aggregate in remaining {
            state.finalize(aggregate, self.config.tombstone_threshold);
        }

        let satisfying_criteria = state.top.offered();
        let (skipped_null_duration, skipped_errors) = state.skips.into_parts();
        let report = Report {
            ranked: state.top.into_ranked(),
            satisfying_criteria,
            skipped_null_duration,
            skipped_errors,
            is_partial: !complete,
            thresholds: Thresholds::from(&self.config),
            scan: state.stats,
            pattern_version: self.classifier.version().to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            "{} sessions satisfy criteria, {} ranked{}",
            report.satisfying_criteria,
            report.ranked.len(),
            if report.is_partial { " (partial)" } else { "" }
        );
        Ok(report)
    }

    /// Phase one. Returns false if cancelled.
    fn scan_sessions(
        &self,
        source: &mut dyn RowSource,
        state: &mut RunState,
    ) -> Result<bool, EngineError> {
        for row in source.scan_sessions()? {
            if self.cancel.is_cancelled() {
                warn!("Cancelled during session scan");
                return Ok(false);
            }
            state.stats.sessions_scanned += 1;

            let row = match row {
                Ok(row) => row,
                Err(RowError::Decode(err)) => {
                    state.skips.record_error(err);
                    continue;
                }
                Err(RowError::Stream(err)) => return Err(err.into()),
            };

            let Some(duration_us) = row.duration_us else {
                state.skips.record_null_duration(row.session_id);
                continue;
            };

            if duration_us < self.config.time_threshold_us {
                state.stats.below_time_threshold += 1;
                continue;
            }

            match state.candidates.entry(row.session_id) {
                Entry::Occupied(_) => {
                    warn!("Duplicate session {}, keeping first row", row.session_id);
                }
                Entry::Vacant(slot) => {
                    slot.insert(CandidateAggregate::seed(row, duration_us));
                }
            }
        }

        state.stats.candidates = state.candidates.len() as u64;
        debug!(
            "Session scan complete: {} scanned, {} candidates",
            state.stats.sessions_scanned, state.stats.candidates
        );
        Ok(true)
    }

    /// Phase two. Returns false if cancelled.
    fn scan_events(
        &self,
        source: &mut dyn RowSource,
        state: &mut RunState,
    ) -> Result<bool, EngineError> {
        for row in source.scan_events()? {
            if self.cancel.is_cancelled() {
                warn!("Cancelled during event scan");
                return Ok(false);
            }
            state.stats.events_scanned += 1;

            let event = match row {
                Ok(event) => event,
                Err(RowError::Decode(err)) => {
                    warn!("Skipping malformed event: {}", err);
                    state.stats.malformed_events += 1;
                    continue;
                }
                Err(RowError::Stream(err)) => return Err(err.into()),
            };

            if self.config.partition_locality {
                self.advance_partition(state, event.session_id);
            }

            let Some(aggregate) = state.candidates.get_mut(&event.session_id) else {
                if state.finalized.contains(&event.session_id) {
                    warn!(
                        "Event for already finalized session {}, ignoring",
                        event.session_id
                    );
                    state.stats.locality_violations += 1;
                }
                continue;
            };

            state.stats.events_matched += 1;
            aggregate.absorb(
                tombstones::tally(&event.activity),
                self.classifier.classify(&event.activity),
            );
        }

        debug!(
            "Event scan complete: {} scanned, {} matched",
            state.stats.events_scanned, state.stats.events_matched
        );
        Ok(true)
    }

    /// Finalize the in-flight session once the event stream moves past it
    fn advance_partition(&self, state: &mut RunState, session_id: Uuid) {
        if state.in_flight == Some(session_id) {
            return;
        }
        if let Some(previous) = state.in_flight.replace(session_id) {
            if let Some(aggregate) = state.candidates.remove(&previous) {
                state.finalized.insert(previous);
                state.finalize(aggregate, self.config.tombstone_threshold);
            }
        }
    }
}
