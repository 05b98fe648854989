//! Real-time Cassandra monitor
//!
//! Polls per-table metrics from a Jolokia agent, aggregates them per
//! keyspace, table and overall, and prints iostat-style rows of the change
//! since the previous poll.

pub mod client;
pub mod collector;
pub mod diff;
pub mod error;
pub mod format;
pub mod jmx;
pub mod metrics;
pub mod runner;

pub use client::{JmxReader, JolokiaClient, MetricReading};
pub use collector::{Collector, CollectorOptions, MetricValues, Snapshot, TOTAL};
pub use error::{StatError, StatResult};
pub use metrics::{MetricSpec, METRICS};
pub use runner::{HeaderCadence, StatRunner};
