//! Per-poll aggregation of Jolokia readings into namespace rows

use crate::client::{JmxReader, MetricReading};
use crate::error::StatResult;
use crate::jmx::parse_jmx_key;
use crate::metrics::{MetricSpec, METRICS};
use ctb_core::config::StatSettings;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Name of the row aggregating every included table
pub const TOTAL: &str = "total";

/// Metric values keyed by display name
pub type MetricValues = BTreeMap<String, f64>;

/// Which tables are read and how they are grouped
#[derive(Debug, Clone, Default)]
pub struct CollectorOptions {
    pub show_system: bool,
    pub show_keyspace: bool,
    pub show_cfs: bool,
    pub show_total: bool,
    pub namespaces: Vec<String>,
    pub system_keyspaces: Vec<String>,
}

impl From<&StatSettings> for CollectorOptions {
    fn from(settings: &StatSettings) -> Self {
        Self {
            show_system: settings.show_system,
            show_keyspace: settings.show_keyspace,
            show_cfs: settings.show_cfs,
            show_total: settings.show_total,
            namespaces: settings.namespaces.clone(),
            system_keyspaces: settings.system_keyspaces.clone(),
        }
    }
}

impl CollectorOptions {
    fn is_system(&self, keyspace: &str) -> bool {
        self.system_keyspaces.iter().any(|k| k == keyspace)
    }

    /// An empty filter includes everything. Dotted entries match one table.
    fn is_included(&self, keyspace: &str, table: &str) -> bool {
        self.namespaces.is_empty()
            || self.namespaces.iter().any(|ns| {
                if ns.contains('.') {
                    ns == table
                } else {
                    ns == keyspace
                }
            })
    }
}

/// Aggregated values from one poll
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub total: Option<MetricValues>,
    pub namespaces: BTreeMap<String, MetricValues>,
}

impl Snapshot {
    pub fn new(with_total: bool) -> Self {
        Self {
            total: with_total.then(MetricValues::new),
            namespaces: BTreeMap::new(),
        }
    }

    /// Rows in output order, total first
    pub fn rows(&self) -> impl Iterator<Item = (&str, &MetricValues)> {
        self.total
            .iter()
            .map(|values| (TOTAL, values))
            .chain(self.namespaces.iter().map(|(ns, v)| (ns.as_str(), v)))
    }

    pub fn get(&self, namespace: &str, display_name: &str) -> Option<f64> {
        let values = if namespace == TOTAL {
            self.total.as_ref()
        } else {
            self.namespaces.get(namespace)
        };
        values.and_then(|v| v.get(display_name).copied())
    }
}

fn merge(values: &mut MetricValues, metric: &MetricSpec, value: f64) {
    match values.get_mut(metric.display_name) {
        None => {
            values.insert(metric.display_name.to_string(), value);
        }
        Some(current) if metric.sum => *current += value,
        Some(current) => {
            if *current < value {
                *current = value;
            }
        }
    }
}

/// Reads every metric and folds the readings into a snapshot
pub struct Collector<R> {
    reader: R,
    options: CollectorOptions,
}

impl<R: JmxReader> Collector<R> {
    pub fn new(reader: R, options: CollectorOptions) -> Self {
        Self { reader, options }
    }

    pub fn options(&self) -> &CollectorOptions {
        &self.options
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Poll every metric once
    ///
    /// A metric that fails to read is skipped for this poll unless the
    /// failure is fatal.
    pub async fn collect(&self) -> StatResult<Snapshot> {
        let mut snapshot = Snapshot::new(self.options.show_total);
        for metric in METRICS {
            match self.reader.read(metric).await {
                Ok(reading) => self.absorb(&mut snapshot, metric, &reading),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("Skipping {} this poll: {}", metric.display_name, e),
            }
        }
        Ok(snapshot)
    }

    /// Fold one metric's readings into `snapshot`
    pub fn absorb(&self, snapshot: &mut Snapshot, metric: &MetricSpec, reading: &MetricReading) {
        for (mbean, &value) in reading {
            let key = match parse_jmx_key(mbean) {
                Ok(key) => key,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };

            // Entries without a keyspace are Cassandra's own rollups
            let Some(keyspace) = key.keyspace() else {
                continue;
            };

            if !self.options.show_system && self.options.is_system(keyspace) {
                continue;
            }

            let table = match key.scope() {
                Some(scope) => format!("{}.{}", keyspace, scope),
                None => keyspace.to_string(),
            };

            if !self.options.is_included(keyspace, &table) {
                debug!("Filtered out {}", table);
                continue;
            }

            let namespace = if self.options.show_cfs {
                Some(table)
            } else if self.options.show_keyspace {
                Some(keyspace.to_string())
            } else {
                None
            };

            if let Some(namespace) = namespace {
                merge(
                    snapshot.namespaces.entry(namespace).or_default(),
                    metric,
                    value,
                );
            }
            if let Some(total) = snapshot.total.as_mut() {
                merge(total, metric, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatError;
    use async_trait::async_trait;

    fn bean(keyspace: &str, table: &str, name: &str) -> String {
        format!(
            "org.apache.cassandra.metrics:keyspace={},name={},scope={},type=ColumnFamily",
            keyspace, name, table
        )
    }

    fn reads() -> &'static MetricSpec {
        &METRICS[0]
    }

    fn read_p99() -> &'static MetricSpec {
        &METRICS[3]
    }

    fn sample() -> MetricReading {
        let mut reading = MetricReading::new();
        reading.insert(bean("app", "users", "ReadLatency"), 100.0);
        reading.insert(bean("app", "events", "ReadLatency"), 40.0);
        reading.insert(bean("billing", "invoices", "ReadLatency"), 7.0);
        reading.insert(bean("system", "local", "ReadLatency"), 1000.0);
        reading.insert(
            "org.apache.cassandra.metrics:name=ReadLatency,type=ColumnFamily".to_string(),
            99999.0,
        );
        reading
    }

    struct NoReader;

    #[async_trait]
    impl JmxReader for NoReader {
        fn describe(&self) -> String {
            "none".to_string()
        }

        async fn read(&self, _metric: &MetricSpec) -> StatResult<MetricReading> {
            Ok(MetricReading::new())
        }
    }

    fn collector(options: CollectorOptions) -> Collector<NoReader> {
        Collector::new(
            NoReader,
            CollectorOptions {
                system_keyspaces: vec!["system".to_string(), "system_auth".to_string()],
                ..options
            },
        )
    }

    #[test]
    fn test_total_skips_system_and_rollups() {
        let collector = collector(CollectorOptions {
            show_total: true,
            ..Default::default()
        });
        let mut snapshot = Snapshot::new(true);
        collector.absorb(&mut snapshot, reads(), &sample());

        assert_eq!(snapshot.get(TOTAL, "Reads"), Some(147.0));
        assert!(snapshot.namespaces.is_empty());
    }

    #[test]
    fn test_show_system_includes_system_keyspaces() {
        let collector = collector(CollectorOptions {
            show_total: true,
            show_system: true,
            ..Default::default()
        });
        let mut snapshot = Snapshot::new(true);
        collector.absorb(&mut snapshot, reads(), &sample());

        assert_eq!(snapshot.get(TOTAL, "Reads"), Some(1147.0));
    }

    #[test]
    fn test_keyspace_rows() {
        let collector = collector(CollectorOptions {
            show_keyspace: true,
            ..Default::default()
        });
        let mut snapshot = Snapshot::new(false);
        collector.absorb(&mut snapshot, reads(), &sample());

        assert_eq!(snapshot.get("app", "Reads"), Some(140.0));
        assert_eq!(snapshot.get("billing", "Reads"), Some(7.0));
        assert!(snapshot.total.is_none());
    }

    #[test]
    fn test_table_rows_take_precedence() {
        let collector = collector(CollectorOptions {
            show_keyspace: true,
            show_cfs: true,
            ..Default::default()
        });
        let mut snapshot = Snapshot::new(false);
        collector.absorb(&mut snapshot, reads(), &sample());

        let rows: Vec<&str> = snapshot.rows().map(|(ns, _)| ns).collect();
        assert_eq!(rows, vec!["app.events", "app.users", "billing.invoices"]);
    }

    #[test]
    fn test_non_sum_metrics_keep_maximum() {
        let collector = collector(CollectorOptions {
            show_keyspace: true,
            show_total: true,
            ..Default::default()
        });
        let mut reading = MetricReading::new();
        reading.insert(bean("app", "users", "ReadLatency"), 12.5);
        reading.insert(bean("app", "events", "ReadLatency"), 30.25);
        reading.insert(bean("billing", "invoices", "ReadLatency"), 3.0);

        let mut snapshot = Snapshot::new(true);
        collector.absorb(&mut snapshot, read_p99(), &reading);

        assert_eq!(snapshot.get("app", "Reads (99%) ms"), Some(30.25));
        assert_eq!(snapshot.get(TOTAL, "Reads (99%) ms"), Some(30.25));
    }

    #[test]
    fn test_namespace_filter() {
        let collector = collector(CollectorOptions {
            show_cfs: true,
            show_total: true,
            namespaces: vec!["app.users".to_string(), "billing".to_string()],
            ..Default::default()
        });
        let mut snapshot = Snapshot::new(true);
        collector.absorb(&mut snapshot, reads(), &sample());

        assert_eq!(snapshot.get("app.users", "Reads"), Some(100.0));
        assert_eq!(snapshot.get("app.events", "Reads"), None);
        assert_eq!(snapshot.get("billing.invoices", "Reads"), Some(7.0));
        assert_eq!(snapshot.get(TOTAL, "Reads"), Some(107.0));
    }

    #[test]
    fn test_malformed_keys_are_skipped() {
        let collector = collector(CollectorOptions {
            show_total: true,
            ..Default::default()
        });
        let mut reading = MetricReading::new();
        reading.insert("garbage".to_string(), 5.0);
        reading.insert(bean("app", "users", "ReadLatency"), 2.0);

        let mut snapshot = Snapshot::new(true);
        collector.absorb(&mut snapshot, reads(), &reading);
        assert_eq!(snapshot.get(TOTAL, "Reads"), Some(2.0));
    }

    /// Serves the same reading for every metric, failing on one of them
    struct FlakyReader {
        fail_on: &'static str,
        fatal: bool,
    }

    #[async_trait]
    impl JmxReader for FlakyReader {
        fn describe(&self) -> String {
            "flaky".to_string()
        }

        async fn read(&self, metric: &MetricSpec) -> StatResult<MetricReading> {
            if metric.display_name == self.fail_on {
                if self.fatal {
                    return Err(StatError::Io(std::io::Error::other("broken pipe")));
                }
                return Err(StatError::Jolokia {
                    mbean: metric.mbean_pattern(),
                    message: "No MBean found".to_string(),
                });
            }
            let mut reading = MetricReading::new();
            reading.insert(bean("app", "users", metric.metric_name), 3.0);
            Ok(reading)
        }
    }

    #[test]
    fn test_collect_skips_failed_metric() {
        let collector = Collector::new(
            FlakyReader {
                fail_on: "Flushes",
                fatal: false,
            },
            CollectorOptions {
                show_total: true,
                ..Default::default()
            },
        );

        let snapshot = tokio_test::block_on(collector.collect()).unwrap();
        assert_eq!(snapshot.get(TOTAL, "Reads"), Some(3.0));
        assert_eq!(snapshot.get(TOTAL, "Flushes"), None);
    }

    #[test]
    fn test_collect_stops_on_fatal_error() {
        let collector = Collector::new(
            FlakyReader {
                fail_on: "Writes",
                fatal: true,
            },
            CollectorOptions::default(),
        );

        let result = tokio_test::block_on(collector.collect());
        assert!(matches!(result, Err(StatError::Io(_))));
    }
}
