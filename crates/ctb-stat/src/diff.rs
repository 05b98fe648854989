//! Change between consecutive snapshots

use crate::collector::{MetricValues, Snapshot};
use crate::metrics::MetricSpec;

/// Values to display for `current` given the `previous` poll
///
/// Every metric gets a value on every row. `diff` metrics report the change
/// since `previous`, treating missing values as zero; the rest report the
/// current value.
pub fn diff(current: &Snapshot, previous: &Snapshot, metrics: &[MetricSpec]) -> Snapshot {
    let row = |namespace: &str, values: &MetricValues| -> MetricValues {
        metrics
            .iter()
            .map(|metric| {
                let now = values.get(metric.display_name).copied().unwrap_or(0.0);
                let shown = if metric.diff {
                    now - previous
                        .get(namespace, metric.display_name)
                        .unwrap_or(0.0)
                } else {
                    now
                };
                (metric.display_name.to_string(), shown)
            })
            .collect()
    };

    Snapshot {
        total: current
            .total
            .as_ref()
            .map(|values| row(crate::collector::TOTAL, values)),
        namespaces: current
            .namespaces
            .iter()
            .map(|(ns, values)| (ns.clone(), row(ns, values)))
            .collect(),
    }
}
