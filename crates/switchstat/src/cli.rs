//! Clap derive structures for the `switchstat` CLI.
//!
//! Defines the command tree, global flags, and shared argument groups.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// switchstat -- flow and port traffic statistics for OpenFlow switches
#[derive(Debug, Parser)]
#[command(
    name = "switchstat",
    version,
    about = "Collect per-switch flow and port traffic statistics",
    long_about = "Polls every connected OpenFlow switch for flow and port statistics\n\
        and appends them to two time-series files: one line per learned flow\n\
        and one line per port, each stamped with the time it was recorded.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'C', env = "SWITCHSTAT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SWITCHSTAT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Stream lines exactly as stored (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the collector against a simulated switch fabric
    Demo(DemoArgs),

    /// Truncate both record streams and write their headers
    Init(StreamArgs),

    /// Parse both record streams and summarize them
    Check(StreamArgs),

    /// Print the records of one stream
    #[command(alias = "rec")]
    Records(RecordsArgs),

    /// Inspect or create the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Stream Arguments ──────────────────────────────────────────

/// Overrides for where the record streams live.
#[derive(Debug, Clone, Default, Args)]
pub struct StreamArgs {
    /// Flow stream file (overrides collector.flow_stats_path)
    #[arg(long, value_name = "PATH")]
    pub flow_out: Option<PathBuf>,

    /// Port stream file (overrides collector.port_stats_path)
    #[arg(long, value_name = "PATH")]
    pub port_out: Option<PathBuf>,
}

// ── Demo ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DemoArgs {
    #[command(flatten)]
    pub streams: StreamArgs,

    /// Time between poll ticks, e.g. "2s" or "500ms" (overrides collector.poll_interval_secs)
    #[arg(long, short = 'i', value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Stop after this long, e.g. "10s" (runs until Ctrl-C if omitted)
    #[arg(long, short = 'd', value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Number of simulated switches
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u64).range(1..=256))]
    pub switches: u64,

    /// Learned flows per switch
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(0..=4096))]
    pub flows: u32,

    /// Physical ports per switch
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u32).range(1..=4096))]
    pub ports: u32,

    /// Disconnect and reconnect one switch halfway through the run
    #[arg(long)]
    pub flap: bool,
}

// ── Records ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RecordsArgs {
    /// Which stream to read
    pub stream: StreamKind,

    /// Only show records for this datapath id (hex)
    #[arg(long, value_parser = parse_datapath)]
    pub datapath: Option<u64>,

    #[command(flatten)]
    pub streams: StreamArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StreamKind {
    /// Learned-flow records
    Flow,
    /// Port records
    Port,
}

fn parse_datapath(s: &str) -> Result<u64, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|e| format!("not a hex datapath id: {e}"))
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration as TOML
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
