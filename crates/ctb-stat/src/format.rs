//! Fixed-width output lines

use crate::collector::{MetricValues, Snapshot, TOTAL};
use crate::metrics::MetricSpec;

const TIME_WIDTH: usize = 12;

fn center(text: &str, width: usize) -> String {
    format!("{:^width$}", text, width = width)
}

/// Integers without decimals, anything else with two
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

pub fn header_line(metrics: &[MetricSpec]) -> String {
    let mut line: String = metrics
        .iter()
        .map(|m| center(m.display_name, m.width()))
        .collect();
    line.push_str(&center("time", TIME_WIDTH));
    line.push_str("ns");
    line
}

fn is_visible(
    namespace: &str,
    values: &MetricValues,
    metrics: &[MetricSpec],
    show_zeros: bool,
) -> bool {
    if show_zeros || namespace == TOTAL {
        return true;
    }
    let mut activity = metrics.iter().filter(|m| m.nonzero).peekable();
    if activity.peek().is_none() {
        return true;
    }
    activity.any(|m| values.get(m.display_name).is_some_and(|v| *v != 0.0))
}

/// One line per visible row of `snapshot`, stamped with `time`
///
/// The total row is always shown when present; other rows are hidden when
/// every activity metric is zero unless `show_zeros` is set.
pub fn data_lines(
    snapshot: &Snapshot,
    metrics: &[MetricSpec],
    show_zeros: bool,
    time: &str,
) -> Vec<String> {
    snapshot
        .rows()
        .filter(|(ns, values)| is_visible(ns, values, metrics, show_zeros))
        .map(|(ns, values)| {
            let mut line: String = metrics
                .iter()
                .map(|m| {
                    let value = values.get(m.display_name).copied().unwrap_or(0.0);
                    center(&format_value(value), m.width())
                })
                .collect();
            line.push_str(&center(time, TIME_WIDTH));
            line.push_str(ns);
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::METRICS;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(12.345), "12.35");
        assert_eq!(format_value(0.5), "0.50");
    }

    #[test]
    fn test_header_line() {
        let header = header_line(&METRICS[..2]);
        assert_eq!(header, " Reads  Ranges     time    ns");
    }

    fn values(pairs: &[(&str, f64)]) -> MetricValues {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_idle_namespaces_are_hidden() {
        let mut snapshot = Snapshot::new(true);
        snapshot.total = Some(values(&[("Reads", 0.0)]));
        snapshot
            .namespaces
            .insert("app".to_string(), values(&[("Reads", 5.0)]));
        snapshot
            .namespaces
            .insert("idle".to_string(), values(&[("Reads", 0.0), ("Compactions", 3.0)]));

        let lines = data_lines(&snapshot, METRICS, false, "12:00:00");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("total"));
        assert!(lines[1].ends_with("app"));

        let all = data_lines(&snapshot, METRICS, true, "12:00:00");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_rows_without_activity_metrics_are_shown() {
        let mut snapshot = Snapshot::new(false);
        snapshot
            .namespaces
            .insert("app".to_string(), values(&[("Compactions", 0.0)]));

        let lines = data_lines(&snapshot, &METRICS[6..7], false, "12:00:00");
        assert_eq!(lines, vec!["      0        12:00:00  app".to_string()]);
    }

    #[test]
    fn test_data_line_layout() {
        let mut snapshot = Snapshot::new(true);
        snapshot.total = Some(values(&[("Reads", 250.0), ("Ranges", 1.5)]));

        let lines = data_lines(&snapshot, &METRICS[..2], false, "09:15:42");
        assert_eq!(lines, vec!["  250    1.50    09:15:42  total".to_string()]);
    }
}
