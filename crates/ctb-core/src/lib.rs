//! cassandra-toolbox core - row types, row source traits, and configuration
//!
//! This crate provides the foundational types shared by the toolbox:
//!
//! - **Rows**: decoded `system_traces.sessions` and `system_traces.events` rows
//! - **Source**: the `RowSource` trait and its per-row / per-stream errors
//! - **Encoding**: timestamp key-encoding variants resolved at the source boundary
//! - **Config**: TOML configuration discovery, env overrides, and validation

pub mod config;
pub mod encoding;
pub mod rows;
pub mod source;

// Re-export commonly used types
pub use config::{ConfigError, ConfigLoader, ToolboxConfig};
pub use encoding::TimestampEncoding;
pub use rows::{EventRow, SessionRow};
pub use source::{RowDecodeError, RowError, RowResult, RowSource, RowStream, SourceError};

/// Toolbox version
pub const TOOLBOX_VERSION: &str = env!("CARGO_PKG_VERSION");
