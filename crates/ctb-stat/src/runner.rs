//! Polling loop

use crate::client::JmxReader;
use crate::collector::{Collector, Snapshot};
use crate::diff::diff;
use crate::error::StatResult;
use crate::format::{data_lines, header_line};
use crate::metrics::METRICS;
use chrono::Local;
use ctb_core::config::StatSettings;
use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tracing::{info, warn};

/// When to print the column header
///
/// `header_rows` of -1 never prints one, 0 prints one at start only, and
/// N > 0 also reprints after every N polls that produced data.
#[derive(Debug, Clone)]
pub struct HeaderCadence {
    header_rows: i64,
    polls: i64,
}

impl HeaderCadence {
    pub fn new(header_rows: i64) -> Self {
        Self {
            header_rows,
            polls: 0,
        }
    }

    /// Whether a header precedes the first poll
    pub fn initial(&self) -> bool {
        self.header_rows >= 0
    }

    /// Register a data poll; true when a header is due before it
    pub fn before_data(&mut self) -> bool {
        if self.header_rows <= 0 {
            return false;
        }
        if self.polls == self.header_rows {
            self.polls = 1;
            true
        } else {
            self.polls += 1;
            false
        }
    }
}

/// Resolves when `signal` fires
///
/// If the signal cannot be listened for, this never resolves and the poller
/// runs until the process is killed.
async fn shutdown_signal<S: Future<Output = std::io::Result<()>>>(signal: S) {
    if let Err(e) = signal.await {
        warn!("Could not listen for Ctrl-C: {}, polling until killed", e);
        std::future::pending::<()>().await;
    }
}

/// Polls a collector at a fixed rate and prints the change between polls
pub struct StatRunner<R, W> {
    collector: Collector<R>,
    rate: Duration,
    show_zeros: bool,
    cadence: HeaderCadence,
    previous: Option<Snapshot>,
    out: W,
}

impl<R: JmxReader, W: Write> StatRunner<R, W> {
    pub fn new(collector: Collector<R>, settings: &StatSettings, out: W) -> Self {
        Self {
            collector,
            rate: Duration::from_secs(settings.rate_secs.max(1)),
            show_zeros: settings.show_zeros,
            cadence: HeaderCadence::new(settings.header_rows),
            previous: None,
            out,
        }
    }

    pub fn with_rate(mut self, rate: Duration) -> Self {
        self.rate = rate;
        self
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Take one snapshot and print its change from the previous one
    ///
    /// The first poll only primes the previous snapshot. Returns the number
    /// of data lines printed.
    pub async fn poll(&mut self) -> StatResult<usize> {
        let current = self.collector.collect().await?;

        let printed = match self.previous.take() {
            Some(previous) => {
                let shown = diff(&current, &previous, METRICS);
                if self.cadence.before_data() {
                    writeln!(self.out, "{}", header_line(METRICS))?;
                }
                let time = Local::now().format("%H:%M:%S").to_string();
                let lines = data_lines(&shown, METRICS, self.show_zeros, &time);
                for line in &lines {
                    writeln!(self.out, "{}", line)?;
                }
                if lines.len() > 1 {
                    writeln!(self.out)?;
                }
                self.out.flush()?;
                lines.len()
            }
            None => 0,
        };

        self.previous = Some(current);
        Ok(printed)
    }

    /// Poll every `rate` until `shutdown` completes
    pub async fn run_until<F: Future<Output = ()>>(mut self, shutdown: F) -> StatResult<W> {
        info!(
            "Polling {} every {:?}",
            self.collector.reader().describe(),
            self.rate
        );

        if self.cadence.initial() {
            writeln!(self.out, "{}", header_line(METRICS))?;
            self.out.flush()?;
        }

        let mut ticker = tokio::time::interval(self.rate);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping stat poller");
                    break;
                }
                _ = ticker.tick() => {
                    self.poll().await?;
                }
            }
        }

        Ok(self.out)
    }

    /// Poll until Ctrl-C
    pub async fn run(self) -> StatResult<W> {
        self.run_until(shutdown_signal(tokio::signal::ctrl_c()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MetricReading;
    use crate::collector::CollectorOptions;
    use crate::metrics::MetricSpec;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_cadence_never() {
        let mut cadence = HeaderCadence::new(-1);
        assert!(!cadence.initial());
        assert!((0..10).all(|_| !cadence.before_data()));
    }

    #[test]
    fn test_cadence_first_only() {
        let mut cadence = HeaderCadence::new(0);
        assert!(cadence.initial());
        assert!((0..10).all(|_| !cadence.before_data()));
    }

    #[test]
    fn test_cadence_every_n() {
        let mut cadence = HeaderCadence::new(3);
        assert!(cadence.initial());
        let due: Vec<bool> = (0..7).map(|_| cadence.before_data()).collect();
        assert_eq!(due, vec![false, false, false, true, false, false, true]);
    }

    /// Reads grow by 100 per poll on one table
    struct CountingReader {
        polls: AtomicU64,
    }

    #[async_trait]
    impl JmxReader for CountingReader {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        async fn read(&self, metric: &MetricSpec) -> StatResult<MetricReading> {
            if metric.display_name == "Reads" {
                self.polls.fetch_add(1, Ordering::SeqCst);
            }
            let n = self.polls.load(Ordering::SeqCst) as f64;
            let mut reading = MetricReading::new();
            let value = if metric.diff { n * 100.0 } else { 0.0 };
            reading.insert(
                format!(
                    "org.apache.cassandra.metrics:keyspace=app,name={},scope=users,type=ColumnFamily",
                    metric.metric_name
                ),
                value,
            );
            Ok(reading)
        }
    }

    fn runner(settings: &StatSettings) -> StatRunner<CountingReader, Vec<u8>> {
        let collector = Collector::new(
            CountingReader {
                polls: AtomicU64::new(0),
            },
            CollectorOptions::from(settings),
        );
        StatRunner::new(collector, settings, Vec::new())
    }

    #[tokio::test]
    async fn test_first_poll_primes() {
        let mut runner = runner(&StatSettings::default());

        assert_eq!(runner.poll().await.unwrap(), 0);
        assert!(runner.output().is_empty());

        assert_eq!(runner.poll().await.unwrap(), 1);
        let text = String::from_utf8(runner.output().clone()).unwrap();
        let line = text.lines().next().unwrap();
        assert!(line.starts_with("  100  "));
        assert!(line.ends_with("total"));
    }

    #[tokio::test]
    async fn test_keyspace_rows_are_separated_by_blank_line() {
        let settings = StatSettings {
            show_keyspace: true,
            ..Default::default()
        };
        let mut runner = runner(&settings);
        runner.poll().await.unwrap();

        assert_eq!(runner.poll().await.unwrap(), 2);
        let text = String::from_utf8(runner.output().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("total"));
        assert!(lines[1].ends_with("app"));
        assert_eq!(lines[2], "");
    }

    #[tokio::test]
    async fn test_shutdown_signal_failure_keeps_polling() {
        let failed = shutdown_signal(async { Err(std::io::Error::other("no signal handler")) });
        assert!(tokio::time::timeout(Duration::from_millis(20), failed)
            .await
            .is_err());

        let fired = shutdown_signal(async { Ok(()) });
        assert!(tokio::time::timeout(Duration::from_millis(20), fired)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_run_until_prints_initial_header() {
        let settings = StatSettings {
            header_rows: 0,
            ..Default::default()
        };
        let out = runner(&settings)
            .with_rate(Duration::from_millis(10))
            .run_until(tokio::time::sleep(Duration::from_millis(45)))
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(&header_line(METRICS)));
        assert_eq!(text.matches("Row Cache Misses").count(), 1);
    }
}
