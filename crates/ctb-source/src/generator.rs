//! Synthetic trace generator
//!
//! Generates a deterministic trace workload for exercising the analyser and
//! the report without a live cluster. Events are interleaved across sessions
//! unless `contiguous_events` is set, so the default output has no partition
//! locality.

use crate::memory::MemoryRowSource;
use chrono::{Duration, TimeZone, Utc};
use ctb_core::{EventRow, RowDecodeError, SessionRow};
use tracing::info;
use uuid::Uuid;

/// Seed for generated session and event ids
const ID_SEED: u128 = 0x7d3a_1b2c_3d4e_11e5_9e5b_b2a3_c4d0_df3b;

/// Start time of the newest generated session (2016-03-01 12:00:00 UTC)
const START_SECS: i64 = 1_456_833_600;

/// Configuration for synthetic trace generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of sessions to generate
    pub sessions: usize,

    /// Events recorded for each session
    pub events_per_session: usize,

    /// Every Nth session is still in flight (null duration, 0 = never)
    pub null_duration_every: usize,

    /// Every Nth session row is undecodable (0 = never)
    pub malformed_every: usize,

    /// Every Nth session scans a tombstone-heavy partition (0 = never)
    pub tombstone_heavy_every: usize,

    /// Shortest generated duration in microseconds
    pub base_duration_us: u64,

    /// Emit each session's events back to back
    pub contiguous_events: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sessions: 200,
            events_per_session: 8,
            null_duration_every: 17,
            malformed_every: 53,
            tombstone_heavy_every: 6,
            base_duration_us: 2_000,
            contiguous_events: false,
        }
    }
}

/// Synthetic trace generator
pub struct TraceGenerator {
    config: GeneratorConfig,
}

fn every(n: usize, i: usize) -> bool {
    n > 0 && i % n == n - 1
}

impl TraceGenerator {
    pub fn new() -> Self {
        Self::with_config(GeneratorConfig::default())
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Activity text for event `step` of session `index`
    fn activity(&self, index: usize, step: usize) -> String {
        let heavy = every(self.config.tombstone_heavy_every, index);
        match step % 8 {
            0 => "Parsing SELECT * FROM app.users WHERE id = ?".to_string(),
            1 => "Preparing statement".to_string(),
            2 if index % 5 == 0 => "Executing indexed scan for users_by_email".to_string(),
            2 => "Executing single-partition query on users".to_string(),
            3 => "Acquiring sstable references".to_string(),
            4 => {
                let tombstones = if heavy { 500 + (index % 7) * 100 } else { index % 3 };
                format!(
                    "Read {} live rows and {} tombstone cells",
                    (index * 13) % 50,
                    tombstones
                )
            }
            5 if index % 7 == 0 => {
                "Digest mismatch: sending READ_REPAIR message to /10.0.0.3".to_string()
            }
            6 if index % 11 == 0 => "Timed out waiting for replica /10.0.0.4".to_string(),
            _ => "Merging data from memtables and sstables".to_string(),
        }
    }

    /// Generate the workload
    pub fn generate(&self) -> MemoryRowSource {
        let start = Utc
            .timestamp_opt(START_SECS, 0)
            .single()
            .unwrap_or_default();
        let mut source = MemoryRowSource::new();
        let mut ids = Vec::with_capacity(self.config.sessions);

        for i in 0..self.config.sessions {
            let id = Uuid::from_u128(ID_SEED ^ i as u128);

            if every(self.config.malformed_every, i) {
                source.push_session_error(RowDecodeError::new(
                    id.to_string(),
                    "duration: 'n/a': invalid digit found in string",
                ));
                continue;
            }

            let duration_us = if every(self.config.null_duration_every, i) {
                None
            } else {
                Some(self.config.base_duration_us + ((i as u64 * 7_919) % 40_000))
            };

            let row = SessionRow::new(id, duration_us, start - Duration::seconds(i as i64))
                .with_request("Execute CQL3 query")
                .with_coordinator(format!("10.0.0.{}", 1 + i % 3));
            source.push_session(row);
            ids.push((i, id));
        }

        let events = |(i, id): (usize, Uuid), step: usize| {
            let mut event = EventRow::new(id, self.activity(i, step));
            event.event_id =
                Uuid::from_u128(ID_SEED.rotate_left(64) ^ ((i as u128) << 32) ^ step as u128);
            event.source_elapsed_us = Some((step as i64 + 1) * 250);
            event.source = format!("10.0.0.{}", 1 + (i + step) % 3);
            event.thread = format!("ReadStage-{}", step % 4);
            event
        };

        if self.config.contiguous_events {
            for &entry in &ids {
                for step in 0..self.config.events_per_session {
                    source.push_event(events(entry, step));
                }
            }
        } else {
            for step in 0..self.config.events_per_session {
                for &entry in &ids {
                    source.push_event(events(entry, step));
                }
            }
        }

        info!(
            "Generated {} session rows and {} event rows",
            source.session_count(),
            source.event_count()
        );
        source
    }
}

impl Default for TraceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
