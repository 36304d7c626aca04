//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Livetiming - lap timing reconstruction from captured live-timing pages
#[derive(Parser, Debug)]
#[command(
    name = "livetiming",
    author,
    version,
    about = "Reconstruct lap timing from captured live-timing pages",
    long_about = "Reads the captured pages of one session, rebuilds every driver's laps,\n\
                  reconciles their times, aligns driver clocks and decodes car and\n\
                  position telemetry."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LIVETIMING_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LIVETIMING_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one captured session
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Directory holding the captured `*.jsonStream` pages
    #[arg(short, long, env = "LIVETIMING_SESSION_DIR")]
    pub session_dir: PathBuf,

    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "LIVETIMING_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the full result as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the full result as JSON on stdout instead of the summary
    #[arg(long)]
    pub json: bool,

    /// Skip car and position telemetry
    #[arg(long)]
    pub no_telemetry: bool,

    /// Process drivers one after another
    #[arg(long)]
    pub sequential: bool,

    /// Check configuration and list the pages found, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Processing timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "LIVETIMING_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LIVETIMING_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "livetiming.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults are shown when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List the page files looked for in a session directory
    #[arg(long)]
    pub pages: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
