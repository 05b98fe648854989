//! JSON report output

use crate::{RenderResult, Renderer};
use ctb_trace::Report;
use std::io::Write;

/// Serializes the whole report
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl Renderer for JsonRenderer {
    fn render(&self, report: &Report, out: &mut dyn Write) -> RenderResult<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *out, report)?;
        } else {
            serde_json::to_writer(&mut *out, report)?;
        }
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ctb_core::{EventRow, SessionRow};
    use ctb_source::MemoryRowSource;
    use ctb_trace::{EngineConfig, TraceEngine};
    use uuid::Uuid;

    #[test]
    fn test_compact_output_is_one_line() {
        let id = Uuid::from_u128(7);
        let mut source = MemoryRowSource::new()
            .with_session(SessionRow::new(id, Some(30_000), Utc::now()))
            .with_event(EventRow::new(id, "Read 1 live rows and 4 tombstone cells"));
        let report = TraceEngine::new(EngineConfig::default())
            .run(&mut source)
            .unwrap();

        let mut buf = Vec::new();
        JsonRenderer::new(false).render(&report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["ranked"][0]["session_id"], id.to_string());
        assert_eq!(value["ranked"][0]["total_tombstones"], 4);
    }
}
