//! CLI argument definitions.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use rcm_core::calendar::parse_timestamp;

#[derive(Parser)]
#[command(
    name = "rcm",
    version,
    about = "Build the revenue-cycle star schema from hospital and claims extracts",
    long_about = "Build the revenue-cycle star schema from hospital and claims extracts.\n\n\
                  Lands raw, cleaned and dimensional tables as CSV layers and keeps\n\
                  patient history and surrogate keys stable across runs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract, normalize, model and land every layer.
    Run(RunArgs),

    /// Print the declared column contract of each table.
    Schema(SchemaArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Configuration file (default: ./rcm.toml when present).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Raw data directory with hospital_a/, hospital_b/, claims/ and reference/.
    ///
    /// Replaces every source path of the configuration.
    #[arg(long = "raw-dir", value_name = "DIR")]
    pub raw_dir: Option<PathBuf>,

    /// Root of the bronze, silver and gold layers.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory of the patient snapshot and key registry.
    #[arg(long = "state-dir", value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Build timestamp in UTC (default: now). Pin it for reproducible runs.
    #[arg(long = "build-time", value_name = "TIMESTAMP", value_parser = parse_build_time)]
    pub build_time: Option<NaiveDateTime>,
}

#[derive(Parser)]
pub struct SchemaArgs {
    /// Only this table (e.g. fact_claims).
    #[arg(value_name = "TABLE")]
    pub table: Option<String>,
}

fn parse_build_time(raw: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(raw).ok_or_else(|| format!("`{raw}` is not a timestamp (YYYY-MM-DD HH:MM:SS)"))
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
