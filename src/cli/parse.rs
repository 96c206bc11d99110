//! CLI parse: clap types for record-hooks. No behavior; definitions only.

use crate::logging::{LogFormat, LogOutput};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use uuid::Uuid;

/// record-hooks CLI - run record event handlers against a local store
#[derive(Parser)]
#[command(name = "record-hooks")]
#[command(about = "Event-triggered record handlers over a local record store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    pub verbose: bool,

    /// trace, debug, info, warn, error or off
    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    #[arg(long, value_enum)]
    pub log_output: Option<LogOutput>,

    /// Log file, used with --log-output file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a record from a JSON file, or merge it into the stored record with the same id
    Put {
        /// Record JSON: {"type_name": ..., "id": ..., "attributes": {...}}
        file: PathBuf,
    },
    /// Show one record
    Get {
        type_name: String,
        id: Uuid,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List records matching equality conditions or a fetch markup file
    Query {
        type_name: String,
        /// Equality condition, repeatable
        #[arg(long = "where", value_name = "ATTR=VALUE")]
        conditions: Vec<String>,
        /// Fetch markup file; replaces --where
        #[arg(long, conflicts_with = "conditions")]
        fetch: Option<PathBuf>,
        /// Columns to show (comma separated); all when omitted
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Run the built-in handlers for an event described in a JSON file
    Dispatch {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Put { .. } => "put",
            Commands::Get { .. } => "get",
            Commands::Query { .. } => "query",
            Commands::Dispatch { .. } => "dispatch",
            Commands::Config => "config",
        }
    }
}
