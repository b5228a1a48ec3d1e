//! Clap derive structures for the `sentinel` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sentinel -- camera relay server and record tools for SentinelPro
#[derive(Debug, Parser)]
#[command(
    name = "sentinel",
    version,
    about = "Relay a camera's MJPEG stream and manage SentinelPro records",
    long_about = "Runs the SentinelPro stream relay, watches a stream with automatic\n\
        reconnect, and reads or writes soldiers, system logs and threats\n\
        in the PostgREST record store.",
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
    /// Config file to use instead of the platform default
    #[arg(long, env = "SENTINEL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SENTINEL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the stream relay and record API
    Serve(ServeArgs),

    /// Watch a stream, reconnecting automatically when it drops
    Watch(WatchArgs),

    /// Manage soldier records
    #[command(alias = "s")]
    Soldiers(SoldiersArgs),

    /// Read and write system logs
    Logs(LogsArgs),

    /// Read and record threats
    Threats(ThreatsArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERVE / WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address (overrides server.bind)
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Camera MJPEG URL (overrides camera.stream_url)
    #[arg(long)]
    pub camera_url: Option<String>,

    /// Multipart boundary advertised to clients
    #[arg(long)]
    pub boundary: Option<String>,

    /// Serve the relay only, even if a record store is configured
    #[arg(long)]
    pub no_store: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stream URL to watch (overrides watch.url)
    pub url: Option<String>,

    /// Delay before an automatic retry, e.g. "5s" (overrides watch.retry_delay_secs)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub retry_delay: Option<Duration>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SOLDIERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SoldiersArgs {
    #[command(subcommand)]
    pub command: SoldiersCommand,
}

#[derive(Debug, Subcommand)]
pub enum SoldiersCommand {
    /// List soldiers, newest first
    #[command(alias = "ls")]
    List,

    /// Add a soldier
    Add(SoldierFieldArgs),

    /// Replace a soldier's fields
    Update {
        /// Soldier ID
        id: String,

        #[command(flatten)]
        fields: SoldierFieldArgs,
    },

    /// Delete a soldier
    #[command(alias = "rm")]
    Remove {
        /// Soldier ID
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct SoldierFieldArgs {
    /// Full name
    #[arg(long)]
    pub name: String,

    /// Rank
    #[arg(long)]
    pub rank: String,

    /// Unit
    #[arg(long)]
    pub unit: Option<String>,

    /// Clearance level
    #[arg(long)]
    pub clearance: Option<String>,

    /// Status, e.g. "active"
    #[arg(long)]
    pub status: Option<String>,

    /// Last-seen timestamp or location
    #[arg(long)]
    pub last_seen: Option<String>,

    /// Recognition confidence
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Avatar image URL
    #[arg(long)]
    pub avatar_url: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOGS / THREATS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub command: LogsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LogsCommand {
    /// List system logs, newest first
    #[command(alias = "ls")]
    List,

    /// Append a system log entry
    Add {
        /// Log message
        message: String,

        /// Level (defaults to INFO)
        #[arg(long, short = 'l')]
        level: Option<String>,

        /// Free-form tag
        #[arg(long, short = 't')]
        tag: Option<String>,

        /// JSON object with extra context
        #[arg(long)]
        context: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ThreatsArgs {
    #[command(subcommand)]
    pub command: ThreatsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ThreatsCommand {
    /// List threats, newest first
    #[command(alias = "ls")]
    List,

    /// Record a threat
    Add {
        /// Threat level, e.g. "HIGH"
        level: String,

        /// What was detected
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Where it was detected
        #[arg(long, short = 's')]
        source: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG / COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a configuration value
    Set {
        /// Dotted key, e.g. "camera.stream_url"
        key: String,

        /// Value to set
        value: String,
    },

    /// Store the record store's anon key in the system keyring
    SetKey,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
