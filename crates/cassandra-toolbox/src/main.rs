//! cassandra-toolbox - diagnosing Cassandra clusters
//!
//! `tracing` ranks the slowest traced query sessions, `stat` polls live
//! per-table traffic over Jolokia, and `demo` runs the trace analysis over a
//! synthetic workload.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ctb_core::config::{StatSettings, TracingSettings};
use ctb_core::{ConfigLoader, RowSource, TimestampEncoding, ToolboxConfig};
use ctb_render::{open_output, renderer_for, OutputFormat};
use ctb_source::{GeneratorConfig, JsonlRowSource, TraceGenerator};
use ctb_stat::{Collector, CollectorOptions, JolokiaClient, StatRunner};
use ctb_trace::{Report, TraceEngine};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "cassandra-toolbox")]
#[command(author = "Knewton Database Team")]
#[command(version)]
#[command(about = "Tools for diagnosing Cassandra clusters", long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "CTB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the slowest traced sessions from system_traces exports
    Tracing {
        /// `SELECT JSON * FROM system_traces.sessions` output
        #[arg(long)]
        sessions: PathBuf,

        /// `SELECT JSON * FROM system_traces.events` output
        #[arg(long)]
        events: PathBuf,

        /// Minimum total tombstones scanned by a session
        #[arg(long)]
        tombstone_threshold: Option<u64>,

        /// Minimum session duration in microseconds
        #[arg(long)]
        time_threshold: Option<u64>,

        /// Maximum number of sessions to report (0 = all)
        #[arg(short, long)]
        num_results: Option<usize>,

        /// Timestamp encoding of the exported rows (native, blob)
        #[arg(long)]
        timestamp_encoding: Option<TimestampEncoding>,

        /// Events for each session are contiguous in the events export
        #[arg(long)]
        partition_locality: bool,

        /// Output format (text, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Truncate requests to this many characters in text output
        #[arg(long)]
        request_width: Option<usize>,
    },

    /// Poll a Jolokia agent and print per-table traffic like iostat
    Stat {
        /// Jolokia agent URL, format http://HOST:PORT
        #[arg(long)]
        host: Option<String>,

        /// Polls between header lines (0 = first only, -1 = never)
        #[arg(long, allow_negative_numbers = true)]
        header_rows: Option<i64>,

        /// Seconds between polls
        #[arg(long)]
        rate: Option<u64>,

        /// Include system keyspaces
        #[arg(long)]
        show_system: bool,

        /// Show keyspace level rows
        #[arg(long)]
        show_keyspace: bool,

        /// Show keyspace.table level rows
        #[arg(long)]
        show_cfs: bool,

        /// Show namespaces with no activity
        #[arg(long)]
        show_zeros: bool,

        /// Suppress the total row
        #[arg(long)]
        no_total: bool,

        /// Comma separated keyspace or keyspace.table names to show
        #[arg(long, value_delimiter = ',')]
        namespaces: Option<Vec<String>>,
    },

    /// Analyse a synthetic trace workload
    Demo {
        /// Number of sessions to generate
        #[arg(long, default_value = "200")]
        sessions: usize,

        /// Events generated per session
        #[arg(long, default_value = "8")]
        events_per_session: usize,

        /// Maximum number of sessions to report (0 = all)
        #[arg(short, long)]
        num_results: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long)]
        format: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.clone())?;

    // CLI verbose flag takes precedence over the configured level
    let log_level = if cli.verbose > 0 {
        match cli.verbose {
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    } else {
        match config.logging.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "error" => Level::ERROR,
            _ => Level::WARN,
        }
    };

    // Logs go to stderr so stdout carries only the report
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Tracing {
            sessions,
            events,
            tombstone_threshold,
            time_threshold,
            num_results,
            timestamp_encoding,
            partition_locality,
            format,
            output,
            request_width,
        } => {
            merge_tracing_config(
                &mut config.tracing,
                TracingArgs {
                    tombstone_threshold,
                    time_threshold,
                    num_results,
                    timestamp_encoding,
                    partition_locality,
                    format,
                    request_width,
                },
            );
            ConfigLoader::new().validate(&config)?;
            tracing_command(config.tracing, sessions, events, output).await
        }
        Commands::Stat {
            host,
            header_rows,
            rate,
            show_system,
            show_keyspace,
            show_cfs,
            show_zeros,
            no_total,
            namespaces,
        } => {
            let stat = &mut config.stat;
            if let Some(host) = host {
                stat.host = host;
            }
            if let Some(header_rows) = header_rows {
                stat.header_rows = header_rows;
            }
            if let Some(rate) = rate {
                stat.rate_secs = rate;
            }
            stat.show_system |= show_system;
            stat.show_keyspace |= show_keyspace;
            stat.show_cfs |= show_cfs;
            stat.show_zeros |= show_zeros;
            if no_total {
                stat.show_total = false;
            }
            if let Some(namespaces) = namespaces {
                stat.namespaces = namespaces
                    .into_iter()
                    .map(|ns| ns.trim().to_string())
                    .filter(|ns| !ns.is_empty())
                    .collect();
            }
            ConfigLoader::new().validate(&config)?;
            stat_command(config.stat).await
        }
        Commands::Demo {
            sessions,
            events_per_session,
            num_results,
            format,
        } => {
            if let Some(cap) = num_results {
                config.tracing.result_cap = cap;
            }
            if let Some(format) = format {
                config.tracing.format = format;
            }
            ConfigLoader::new().validate(&config)?;
            demo_command(config.tracing, sessions, events_per_session).await
        }
    }
}

/// Load configuration from file/env
fn load_config(cli_path: Option<PathBuf>) -> anyhow::Result<ToolboxConfig> {
    ConfigLoader::new()
        .with_cli_path(cli_path)
        .load()
        .context("Failed to load configuration")
}

/// Trace analysis flags given on the command line
struct TracingArgs {
    tombstone_threshold: Option<u64>,
    time_threshold: Option<u64>,
    num_results: Option<usize>,
    timestamp_encoding: Option<TimestampEncoding>,
    partition_locality: bool,
    format: Option<String>,
    request_width: Option<usize>,
}

/// CLI arguments take precedence when explicitly provided
fn merge_tracing_config(settings: &mut TracingSettings, args: TracingArgs) {
    if let Some(threshold) = args.tombstone_threshold {
        settings.tombstone_threshold = threshold;
    }
    if let Some(threshold) = args.time_threshold {
        settings.time_threshold_us = threshold;
    }
    if let Some(cap) = args.num_results {
        settings.result_cap = cap;
    }
    if let Some(encoding) = args.timestamp_encoding {
        settings.timestamp_encoding = encoding;
    }
    settings.partition_locality |= args.partition_locality;
    if let Some(format) = args.format {
        settings.format = format;
    }
    if let Some(width) = args.request_width {
        settings.request_width = width;
    }
}

async fn tracing_command(
    settings: TracingSettings,
    sessions: PathBuf,
    events: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let source =
        JsonlRowSource::new(sessions, events).with_encoding(settings.timestamp_encoding);
    let report = analyse(&settings, source).await?;
    write_report(&settings, &report, output)
}

async fn demo_command(
    settings: TracingSettings,
    sessions: usize,
    events_per_session: usize,
) -> anyhow::Result<()> {
    info!(
        "Generating {} sessions with {} events each",
        sessions, events_per_session
    );
    let source = TraceGenerator::with_config(GeneratorConfig {
        sessions,
        events_per_session,
        ..Default::default()
    })
    .generate();
    let report = analyse(&settings, source).await?;
    write_report(&settings, &report, None)
}

/// Run the engine on a blocking thread, cancelling it on Ctrl-C
async fn analyse<S>(settings: &TracingSettings, mut source: S) -> anyhow::Result<Report>
where
    S: RowSource + Send + 'static,
{
    let engine = TraceEngine::from_settings(settings)?;
    let token = engine.cancel_token();
    let mut handle = tokio::task::spawn_blocking(move || engine.run(&mut source));

    let report = tokio::select! {
        result = &mut handle => result??,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, reporting what was analysed so far");
            token.cancel();
            handle.await??
        }
    };
    Ok(report)
}

fn write_report(
    settings: &TracingSettings,
    report: &Report,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let format: OutputFormat = settings.format.parse()?;
    let mut out = open_output(output.as_deref())?;
    renderer_for(format, settings.request_width).render(report, &mut *out)?;
    Ok(())
}

async fn stat_command(settings: StatSettings) -> anyhow::Result<()> {
    let client = JolokiaClient::new(&settings.host, Duration::from_secs(settings.timeout_secs))?;
    let collector = Collector::new(client, CollectorOptions::from(&settings));
    let runner = StatRunner::new(collector, &settings, std::io::stdout());
    runner.run().await?;
    Ok(())
}
