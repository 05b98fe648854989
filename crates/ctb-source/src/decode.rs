//! Raw JSON row decoding
//!
//! Column names follow `system_traces.sessions` / `system_traces.events`.

use ctb_core::{EventRow, RowDecodeError, SessionRow, TimestampEncoding};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

type Object = Map<String, Value>;

pub(crate) fn decode_session(
    value: Value,
    encoding: TimestampEncoding,
    line: u64,
) -> Result<SessionRow, RowDecodeError> {
    let obj = as_object(&value, line)?;
    let session_id = decode_uuid(obj, "session_id", line)?;
    let identity = session_id.to_string();
    let fail = |message: String| RowDecodeError::new(identity.clone(), message);

    let duration_us = optional_u64(obj.get("duration"))
        .map_err(|e| fail(format!("duration: {}", e)))?;

    // A session still in flight is only counted, so its other columns are
    // decoded best-effort and never turn it into a decode error.
    if duration_us.is_none() {
        return Ok(SessionRow {
            session_id,
            duration_us,
            started_at: encoding
                .decode(obj.get("started_at").unwrap_or(&Value::Null))
                .unwrap_or_default(),
            request: text(obj.get("request")).unwrap_or_default(),
            parameters: parameters(obj.get("parameters")).unwrap_or_default(),
            coordinator: text(obj.get("coordinator")).unwrap_or_default(),
        });
    }

    let started_at = encoding
        .decode(obj.get("started_at").unwrap_or(&Value::Null))
        .map_err(|e| fail(format!("started_at: {}", e)))?;
    let request = text(obj.get("request")).map_err(|e| fail(format!("request: {}", e)))?;
    let coordinator =
        text(obj.get("coordinator")).map_err(|e| fail(format!("coordinator: {}", e)))?;
    let parameters =
        parameters(obj.get("parameters")).map_err(|e| fail(format!("parameters: {}", e)))?;

    Ok(SessionRow {
        session_id,
        duration_us,
        started_at,
        request,
        parameters,
        coordinator,
    })
}

pub(crate) fn decode_event(value: Value, line: u64) -> Result<EventRow, RowDecodeError> {
    let obj = as_object(&value, line)?;
    let session_id = decode_uuid(obj, "session_id", line)?;
    let identity = session_id.to_string();
    let fail = |message: String| RowDecodeError::new(identity.clone(), message);

    let event_id = match obj.get("event_id") {
        Some(Value::String(s)) => {
            Uuid::parse_str(s).map_err(|e| fail(format!("event_id '{}': {}", s, e)))?
        }
        Some(other) => return Err(fail(format!("event_id: unexpected value {}", other))),
        None => return Err(fail("event_id: missing".to_string())),
    };
    let source_elapsed_us = optional_i64(obj.get("source_elapsed"))
        .map_err(|e| fail(format!("source_elapsed: {}", e)))?;

    Ok(EventRow {
        session_id,
        event_id,
        activity: text(obj.get("activity")).map_err(|e| fail(format!("activity: {}", e)))?,
        source_elapsed_us,
        source: text(obj.get("source")).map_err(|e| fail(format!("source: {}", e)))?,
        thread: text(obj.get("thread")).map_err(|e| fail(format!("thread: {}", e)))?,
    })
}

fn line_identity(line: u64) -> String {
    format!("line {}", line)
}

fn as_object(value: &Value, line: u64) -> Result<&Object, RowDecodeError> {
    value
        .as_object()
        .ok_or_else(|| RowDecodeError::new(line_identity(line), "expected a JSON object"))
}

fn decode_uuid(obj: &Object, key: &str, line: u64) -> Result<Uuid, RowDecodeError> {
    match obj.get(key) {
        Some(Value::String(raw)) => Uuid::parse_str(raw)
            .map_err(|e| RowDecodeError::new(raw.clone(), format!("{}: {}", key, e))),
        Some(other) => Err(RowDecodeError::new(
            other.to_string(),
            format!("{}: expected a UUID string", key),
        )),
        None => Err(RowDecodeError::new(
            line_identity(line),
            format!("{}: missing", key),
        )),
    }
}

fn optional_u64(value: Option<&Value>) -> Result<Option<u64>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| format!("{} is not a non-negative integer", n)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| format!("'{}': {}", s, e)),
        Some(other) => Err(format!("unexpected value {}", other)),
    }
}

fn optional_i64(value: Option<&Value>) -> Result<Option<i64>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{} is not an integer", n)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e| format!("'{}': {}", s, e)),
        Some(other) => Err(format!("unexpected value {}", other)),
    }
}

fn text(value: Option<&Value>) -> Result<String, String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!("expected a string, got {}", other)),
    }
}

fn parameters(value: Option<&Value>) -> Result<BTreeMap<String, String>, String> {
    let obj = match value {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(obj)) => obj,
        Some(other) => return Err(format!("expected a map, got {}", other)),
    };

    obj.iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                Value::Number(_) | Value::Bool(_) => v.to_string(),
                other => return Err(format!("{}: non-scalar value {}", k, other)),
            };
            Ok((k.clone(), v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "b2a3c4d0-df3b-11e5-9e5b-7d3a1b2c3d4e";

    fn session(duration: Value) -> Value {
        json!({
            "session_id": ID,
            "duration": duration,
            "started_at": "2016-03-01 12:00:00.000Z",
            "request": "Execute CQL3 query",
            "parameters": {"consistency_level": "QUORUM", "page_size": 5000},
            "coordinator": "10.0.0.1"
        })
    }

    #[test]
    fn test_decode_full_session() {
        let row = decode_session(session(json!(19696)), TimestampEncoding::Native, 1).unwrap();
        assert_eq!(row.session_id.to_string(), ID);
        assert_eq!(row.duration_us, Some(19696));
        assert_eq!(row.request, "Execute CQL3 query");
        assert_eq!(row.coordinator, "10.0.0.1");
        assert_eq!(row.parameters.get("page_size").unwrap(), "5000");
    }

    #[test]
    fn test_null_and_string_durations() {
        let row = decode_session(session(json!(null)), TimestampEncoding::Native, 1).unwrap();
        assert_eq!(row.duration_us, None);

        let row = decode_session(session(json!("20569")), TimestampEncoding::Native, 1).unwrap();
        assert_eq!(row.duration_us, Some(20569));
    }

    #[test]
    fn test_bad_duration_keeps_session_identity() {
        let err = decode_session(session(json!("fast")), TimestampEncoding::Native, 3)
            .unwrap_err();
        assert_eq!(err.session_id, ID);
        assert!(err.message.starts_with("duration"));

        let err =
            decode_session(session(json!(-5)), TimestampEncoding::Native, 3).unwrap_err();
        assert_eq!(err.session_id, ID);
    }

    #[test]
    fn test_wrong_encoding_is_a_decode_error() {
        let err =
            decode_session(session(json!(10)), TimestampEncoding::Blob, 1).unwrap_err();
        assert_eq!(err.session_id, ID);
        assert!(err.message.starts_with("started_at"));
    }

    #[test]
    fn test_in_flight_session_tolerates_bad_columns() {
        let value = json!({
            "session_id": ID,
            "duration": null,
            "started_at": "2016-03-01 12:00:00.000Z",
            "request": 42,
            "parameters": "oops",
            "coordinator": "10.0.0.1"
        });
        let row = decode_session(value, TimestampEncoding::Blob, 2).unwrap();
        assert_eq!(row.session_id.to_string(), ID);
        assert_eq!(row.duration_us, None);
        assert_eq!(row.started_at.timestamp(), 0);
        assert_eq!(row.request, "");
        assert!(row.parameters.is_empty());
        assert_eq!(row.coordinator, "10.0.0.1");
    }

    #[test]
    fn test_bad_session_id_reports_raw_text() {
        let value = json!({"session_id": "not-a-uuid", "duration": 1});
        let err = decode_session(value, TimestampEncoding::Native, 9).unwrap_err();
        assert_eq!(err.session_id, "not-a-uuid");

        let err = decode_session(json!({"duration": 1}), TimestampEncoding::Native, 9)
            .unwrap_err();
        assert_eq!(err.session_id, "line 9");

        let err = decode_session(json!([1, 2]), TimestampEncoding::Native, 4).unwrap_err();
        assert_eq!(err.session_id, "line 4");
    }

    #[test]
    fn test_decode_event() {
        let value = json!({
            "session_id": ID,
            "event_id": "c1d2e3f0-df3b-11e5-9e5b-7d3a1b2c3d4e",
            "activity": "Read 17 live and 32 tombstone cells",
            "source_elapsed": 1234,
            "source": "10.0.0.2",
            "thread": "ReadStage:42"
        });
        let row = decode_event(value, 1).unwrap();
        assert_eq!(row.activity, "Read 17 live and 32 tombstone cells");
        assert_eq!(row.source_elapsed_us, Some(1234));
        assert_eq!(row.thread, "ReadStage:42");
    }

    #[test]
    fn test_event_missing_event_id() {
        let err = decode_event(json!({"session_id": ID, "activity": "x"}), 2).unwrap_err();
        assert_eq!(err.session_id, ID);
        assert!(err.message.contains("event_id"));
    }
}
