//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

/// logtriage -- sort log noise from interesting lines with ordered rules.
///
/// Use `logtriage <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logtriage", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logtriage.toml configuration file.
    #[arg(short, long, global = true, default_value = "logtriage.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage classification rules.
    Rules(RulesArgs),

    /// Fetch and list logs with their verdicts.
    Logs(LogsArgs),

    /// Turn a fetched log line into a ham or spam rule.
    Classify(ClassifyArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- rules ----

#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List rules, most recent first.
    List {
        /// Only rules whose comment or matcher values contain this text.
        #[arg(long)]
        filter: Option<String>,

        /// Maximum number of rules to show.
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Delete a rule by ID.
    Delete {
        /// Rule ID.
        id: u64,
    },
    /// Rule counts and hits grouped by source.
    Stats {
        /// Number of sources to show.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

// ---- logs ----

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Only logs whose raw payload contains this text.
    #[arg(long)]
    pub filter: Option<String>,

    /// Show the spam half instead of the unclassified and ham logs.
    #[arg(long)]
    pub spam: bool,

    /// Maximum number of logs to show.
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

// ---- classify ----

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("verdict").required(true).args(["ham", "spam"])))]
pub struct ClassifyArgs {
    /// Content hash of the log, as shown by `logtriage logs`.
    pub hash: u64,

    /// Matching logs are interesting.
    #[arg(long)]
    pub ham: bool,

    /// Matching logs are noise.
    #[arg(long)]
    pub spam: bool,
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, database, source).
        #[arg(long)]
        section: Option<String>,
    },
}
