//! In-memory row source

use ctb_core::{
    EventRow, RowDecodeError, RowError, RowSource, RowStream, SessionRow, SourceError,
};

/// Row source over rows already held in memory
///
/// Per-row decode failures can be injected to mimic a malformed backend row.
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    sessions: Vec<Result<SessionRow, RowDecodeError>>,
    events: Vec<Result<EventRow, RowDecodeError>>,
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_session(&mut self, row: SessionRow) {
        self.sessions.push(Ok(row));
    }

    pub fn push_session_error(&mut self, err: RowDecodeError) {
        self.sessions.push(Err(err));
    }

    pub fn push_event(&mut self, row: EventRow) {
        self.events.push(Ok(row));
    }

    pub fn push_event_error(&mut self, err: RowDecodeError) {
        self.events.push(Err(err));
    }

    pub fn with_session(mut self, row: SessionRow) -> Self {
        self.push_session(row);
        self
    }

    pub fn with_event(mut self, row: EventRow) -> Self {
        self.push_event(row);
        self
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

impl RowSource for MemoryRowSource {
    fn describe(&self) -> String {
        format!(
            "memory({} sessions, {} events)",
            self.sessions.len(),
            self.events.len()
        )
    }

    fn scan_sessions(&mut self) -> Result<RowStream<'_, SessionRow>, SourceError> {
        Ok(Box::new(
            self.sessions.iter().cloned().map(|r| r.map_err(RowError::from)),
        ))
    }

    fn scan_events(&mut self) -> Result<RowStream<'_, EventRow>, SourceError> {
        Ok(Box::new(
            self.events.iter().cloned().map(|r| r.map_err(RowError::from)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_scans_are_repeatable() {
        let id = Uuid::new_v4();
        let mut source = MemoryRowSource::new()
            .with_session(SessionRow::new(id, Some(100), Utc::now()))
            .with_event(EventRow::new(id, "Parsing SELECT"));
        source.push_session_error(RowDecodeError::new("bad", "duration: 'x'"));

        assert_eq!(source.scan_sessions().unwrap().count(), 2);
        assert_eq!(source.scan_sessions().unwrap().count(), 2);
        assert_eq!(source.scan_events().unwrap().count(), 1);
        assert_eq!(source.describe(), "memory(2 sessions, 1 events)");
    }

    #[test]
    fn test_injected_errors_surface_as_decode_errors() {
        let mut source = MemoryRowSource::new();
        source.push_event_error(RowDecodeError::new("line 3", "invalid JSON"));

        let rows: Vec<_> = source.scan_events().unwrap().collect();
        assert!(matches!(rows[0], Err(RowError::Decode(_))));
    }
}
