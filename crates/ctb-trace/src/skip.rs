//! Bookkeeping for session rows left out of the analysis

use ctb_core::RowDecodeError;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

/// Why a session row was not analysed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The session was still in flight when traced
    NullDuration,
    /// The row could not be decoded
    Error,
}

/// A skipped session row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipRecord {
    pub session_id: String,
    pub reason: SkipReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Collects skipped rows during phase one
///
/// Null-duration sessions are routine and only counted. Decode failures are
/// kept in full so they can be listed in the report.
#[derive(Debug, Default)]
pub struct SkipTracker {
    null_duration: u64,
    errors: Vec<SkipRecord>,
}

impl SkipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_null_duration(&mut self, session_id: Uuid) {
        debug!("Skipping in-flight session {}", session_id);
        self.null_duration += 1;
    }

    pub fn record_error(&mut self, err: RowDecodeError) {
        warn!("{}", err);
        self.errors.push(SkipRecord {
            session_id: err.session_id,
            reason: SkipReason::Error,
            message: Some(err.message),
        });
    }

    pub fn null_duration_count(&self) -> u64 {
        self.null_duration
    }

    pub fn errors(&self) -> &[SkipRecord] {
        &self.errors
    }

    pub fn into_parts(self) -> (u64, Vec<SkipRecord>) {
        (self.null_duration, self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_both_kinds() {
        let mut tracker = SkipTracker::new();
        tracker.record_null_duration(Uuid::new_v4());
        tracker.record_null_duration(Uuid::new_v4());
        tracker.record_error(RowDecodeError::new("line 4", "invalid JSON"));

        assert_eq!(tracker.null_duration_count(), 2);
        assert_eq!(tracker.errors().len(), 1);
        assert_eq!(tracker.errors()[0].reason, SkipReason::Error);

        let (nulls, errors) = tracker.into_parts();
        assert_eq!(nulls, 2);
        assert_eq!(errors[0].session_id, "line 4");
        assert_eq!(errors[0].message.as_deref(), Some("invalid JSON"));
    }
}
