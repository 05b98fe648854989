//! Polled metric table
//!
//! Display names double as metric identities in snapshots, so they must be
//! unique within the table.

/// One polled metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    /// JMX `name` property, e.g. `ReadLatency`
    pub metric_name: &'static str,

    /// Attribute read from the MBean, e.g. `Count`
    pub metric_key: &'static str,

    /// Column heading
    pub display_name: &'static str,

    /// Aggregate by adding; otherwise keep the maximum
    pub sum: bool,

    /// Report the change since the previous poll
    pub diff: bool,

    /// A row where every `nonzero` metric is zero is hidden
    pub nonzero: bool,

    /// Column width override
    pub width: Option<usize>,
}

impl MetricSpec {
    const fn new(
        metric_name: &'static str,
        metric_key: &'static str,
        display_name: &'static str,
    ) -> Self {
        Self {
            metric_name,
            metric_key,
            display_name,
            sum: false,
            diff: false,
            nonzero: false,
            width: None,
        }
    }

    const fn summed(mut self) -> Self {
        self.sum = true;
        self
    }

    const fn diffed(mut self) -> Self {
        self.diff = true;
        self
    }

    const fn activity(mut self) -> Self {
        self.nonzero = true;
        self
    }

    /// Column width: display name plus two unless overridden
    pub fn width(&self) -> usize {
        self.width.unwrap_or(self.display_name.len() + 2)
    }

    /// MBean pattern matching this metric on every table
    pub fn mbean_pattern(&self) -> String {
        format!(
            "org.apache.cassandra.metrics:type=ColumnFamily,*,name={}",
            self.metric_name
        )
    }
}

pub const METRICS: &[MetricSpec] = &[
    MetricSpec::new("ReadLatency", "Count", "Reads")
        .summed()
        .diffed()
        .activity(),
    MetricSpec::new("RangeLatency", "Count", "Ranges")
        .summed()
        .diffed()
        .activity(),
    MetricSpec::new("WriteLatency", "Count", "Writes")
        .summed()
        .diffed()
        .activity(),
    MetricSpec::new("ReadLatency", "99thPercentile", "Reads (99%) ms"),
    MetricSpec::new("RangeLatency", "99thPercentile", "Ranges (99%) ms"),
    MetricSpec::new("WriteLatency", "99thPercentile", "Writes (99%) ms"),
    MetricSpec::new("PendingCompactions", "Value", "Compactions").summed(),
    MetricSpec::new("PendingFlushes", "Count", "Flushes").summed(),
    MetricSpec::new("RowCacheMiss", "Count", "Row Cache Misses")
        .summed()
        .diffed(),
];
