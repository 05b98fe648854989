//! Timestamp key-encoding variants
//!
//! Some backends expose timestamp-derived columns through a composite/blob
//! key layout instead of a native timestamp. The variant is chosen once per
//! row source and resolved here; nothing downstream of the source sees it.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How timestamp columns are encoded by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampEncoding {
    /// RFC 3339 / cqlsh text, or integer epoch milliseconds
    #[default]
    Native,
    /// `0x`-prefixed big-endian 8-byte epoch milliseconds
    Blob,
}

impl TimestampEncoding {
    /// Decode a raw column value into a UTC timestamp
    pub fn decode(&self, raw: &Value) -> Result<DateTime<Utc>, String> {
        match self {
            TimestampEncoding::Native => decode_native(raw),
            TimestampEncoding::Blob => decode_blob(raw),
        }
    }
}

impl fmt::Display for TimestampEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampEncoding::Native => write!(f, "native"),
            TimestampEncoding::Blob => write!(f, "blob"),
        }
    }
}

impl FromStr for TimestampEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(TimestampEncoding::Native),
            "blob" => Ok(TimestampEncoding::Blob),
            other => Err(format!(
                "Unknown timestamp encoding: {}. Must be one of: native, blob",
                other
            )),
        }
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| format!("timestamp {} ms is out of range", millis))
}

fn decode_native(raw: &Value) -> Result<DateTime<Utc>, String> {
    match raw {
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .ok_or_else(|| format!("timestamp {} is not an integer", n))?;
            from_millis(millis)
        }
        Value::String(s) => parse_timestamp_text(s.trim()),
        Value::Null => Err("timestamp is null".to_string()),
        other => Err(format!("unexpected timestamp value: {}", other)),
    }
}

fn parse_timestamp_text(text: &str) -> Result<DateTime<Utc>, String> {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        let millis = text
            .parse::<i64>()
            .map_err(|e| format!("invalid timestamp '{}': {}", text, e))?;
        return from_millis(millis);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }

    // cqlsh renders "2016-03-01 12:00:00.123000+0000" or "... 12:00:00.123Z"
    let normalized = match text.strip_suffix('Z') {
        Some(rest) => format!("{}+0000", rest),
        None => text.to_string(),
    };
    if let Ok(ts) = DateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f%z") {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    Err(format!("unrecognized timestamp '{}'", text))
}

fn decode_blob(raw: &Value) -> Result<DateTime<Utc>, String> {
    let text = raw
        .as_str()
        .ok_or_else(|| format!("blob timestamp must be a hex string, got {}", raw))?;
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or_else(|| format!("blob timestamp '{}' is missing the 0x prefix", text))?;
    let bytes = hex::decode(digits).map_err(|e| format!("invalid blob '{}': {}", text, e))?;
    let buf: [u8; 8] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("blob timestamp must be 8 bytes, got {}", bytes.len()))?;
    from_millis(i64::from_be_bytes(buf))
}
