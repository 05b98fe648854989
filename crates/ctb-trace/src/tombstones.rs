//! Tombstone counts from trace event activity text
//!
//! Cassandra 2.0 writes "Read N live and M tombstoned cells"; later releases
//! write "Read N live rows and M tombstone cells". Each table entry captures
//! the tombstone count as `tombstones`.

use regex::Regex;
use std::sync::LazyLock;

static TOMBSTONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(
            r"(?i)read\s+\d+\s+live\s+(?:rows\s+)?and\s+(?P<tombstones>\d+)\s+tombstoned?\s+cells",
        )
        .unwrap(),
    ]
});

/// Tombstones scanned according to one event's activity text
///
/// Returns 0 when no pattern matches or the count does not fit in a `u64`.
pub fn tally(activity: &str) -> u64 {
    TOMBSTONE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(activity))
        .and_then(|caps| caps.name("tombstones"))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
