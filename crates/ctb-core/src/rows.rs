//! Decoded trace rows
//!
//! These mirror the `system_traces.sessions` and `system_traces.events`
//! tables after the row source has resolved every encoding difference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One traced query session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRow {
    /// Session ID
    pub session_id: Uuid,

    /// Total duration in microseconds, absent while the session is in flight
    pub duration_us: Option<u64>,

    /// When the coordinator started the session
    pub started_at: DateTime<Utc>,

    /// Request description (may be empty)
    pub request: String,

    /// Request parameters (informational only)
    pub parameters: BTreeMap<String, String>,

    /// Coordinator address
    pub coordinator: String,
}

impl SessionRow {
    /// Create a session row with empty informational fields
    pub fn new(session_id: Uuid, duration_us: Option<u64>, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            duration_us,
            started_at,
            request: String::new(),
            parameters: BTreeMap::new(),
            coordinator: String::new(),
        }
    }

    pub fn with_request(mut self, request: impl Into<String>) -> Self {
        self.request = request.into();
        self
    }

    pub fn with_coordinator(mut self, coordinator: impl Into<String>) -> Self {
        self.coordinator = coordinator.into();
        self
    }
}

/// One recorded step of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRow {
    /// Owning session ID
    pub session_id: Uuid,

    /// Event ID (a timeuuid in Cassandra)
    pub event_id: Uuid,

    /// Free-text activity description
    pub activity: String,

    /// Elapsed microseconds on the source node
    pub source_elapsed_us: Option<i64>,

    /// Node that recorded the event
    pub source: String,

    /// Thread that recorded the event
    pub thread: String,
}

impl EventRow {
    /// Create an event row with empty source/thread
    pub fn new(session_id: Uuid, activity: impl Into<String>) -> Self {
        Self {
            session_id,
            event_id: Uuid::new_v4(),
            activity: activity.into(),
            source_elapsed_us: None,
            source: String::new(),
            thread: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_row_builder() {
        let id = Uuid::new_v4();
        let row = SessionRow::new(id, Some(42), Utc::now())
            .with_request("Execute CQL3 query")
            .with_coordinator("10.0.0.1");

        assert_eq!(row.session_id, id);
        assert_eq!(row.duration_us, Some(42));
        assert_eq!(row.request, "Execute CQL3 query");
        assert_eq!(row.coordinator, "10.0.0.1");
        assert!(row.parameters.is_empty());
    }

    #[test]
    fn test_event_rows_get_distinct_ids() {
        let session = Uuid::new_v4();
        let a = EventRow::new(session, "Parsing SELECT");
        let b = EventRow::new(session, "Parsing SELECT");
        assert_eq!(a.session_id, b.session_id);
        assert_ne!(a.event_id, b.event_id);
    }
}
