//! Per-session accumulator

use crate::flags::{Flag, FlagSet};
use chrono::{DateTime, Utc};
use ctb_core::SessionRow;
use serde::Serialize;
use uuid::Uuid;

/// A session that met the time threshold, plus what its events revealed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateAggregate {
    pub session_id: Uuid,
    pub duration_us: u64,
    pub started_at: DateTime<Utc>,
    pub request: String,
    pub coordinator: String,

    /// Largest tombstone count reported by a single event
    pub max_tombstones_single_event: u64,

    /// Sum of tombstone counts across all events
    pub total_tombstones: u64,

    /// Events joined to this session
    pub event_count: u64,

    pub flags: FlagSet,
}

impl CandidateAggregate {
    /// Start an aggregate from a session row with a known duration
    pub fn seed(row: SessionRow, duration_us: u64) -> Self {
        Self {
            session_id: row.session_id,
            duration_us,
            started_at: row.started_at,
            request: row.request,
            coordinator: row.coordinator,
            max_tombstones_single_event: 0,
            total_tombstones: 0,
            event_count: 0,
            flags: FlagSet::new(),
        }
    }

    /// Fold one event's tombstone count and flags into the aggregate
    pub fn absorb(&mut self, tombstones: u64, flags: FlagSet) {
        self.event_count += 1;
        self.total_tombstones = self.total_tombstones.saturating_add(tombstones);
        self.max_tombstones_single_event = self.max_tombstones_single_event.max(tombstones);
        self.flags.extend(flags);
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }
}
