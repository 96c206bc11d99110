//! Logging
//!
//! Structured logging through `tracing`. Level, format, and destination come from the
//! `[logging]` config section; `RECORD_HOOKS_LOG*` environment variables win over it.

use crate::error::ContextError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Full filter directive string; replaces level and modules when set.
pub const LOG_ENV: &str = "RECORD_HOOKS_LOG";
pub const LOG_FORMAT_ENV: &str = "RECORD_HOOKS_LOG_FORMAT";
pub const LOG_OUTPUT_ENV: &str = "RECORD_HOOKS_LOG_OUTPUT";
/// Extra `module=level` pairs, comma separated.
pub const LOG_MODULES_ENV: &str = "RECORD_HOOKS_LOG_MODULES";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Invalid log format '{}' (expected text or json)", other)),
        }
    }
}

/// Where log lines go. Command output owns stdout, so stderr is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            other => Err(format!(
                "Invalid log output '{}' (expected stdout, stderr or file)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error or off
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Used when `output` is `file`
    pub file: PathBuf,
    /// ANSI colors for text output on a terminal stream
    pub color: bool,
    /// Per-module levels, e.g. `"record_hooks::query" = "debug"`
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stderr,
            file: PathBuf::from(".record-hooks/record-hooks.log"),
            color: true,
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Check the level and module directives without touching the environment.
    pub fn validate(&self) -> Result<(), String> {
        self.level
            .parse::<LevelFilter>()
            .map_err(|_| format!("Invalid log level '{}'", self.level))?;
        for (module, level) in &self.modules {
            module_directive(module, level)?;
        }
        Ok(())
    }

    /// Level plus module directives, ignoring the environment.
    fn filter(&self) -> Result<EnvFilter, String> {
        let mut filter = EnvFilter::try_new(&self.level).map_err(|e| e.to_string())?;
        for (module, level) in &self.modules {
            filter = filter.add_directive(module_directive(module, level)?);
        }
        Ok(filter)
    }
}

fn module_directive(module: &str, level: &str) -> Result<Directive, String> {
    format!("{}={}", module, level)
        .parse()
        .map_err(|e| format!("Invalid level '{}' for module '{}': {}", level, module, e))
}

/// `a=debug,b::c=trace`; malformed entries are skipped.
fn parse_module_levels(list: &str) -> Vec<(&str, &str)> {
    list.split(',')
        .filter_map(|entry| entry.split_once('='))
        .map(|(module, level)| (module.trim(), level.trim()))
        .filter(|(module, level)| !module.is_empty() && !level.is_empty())
        .collect()
}

/// Environment override for one setting; unset means "keep the configured value".
fn env_override<T: FromStr<Err = String>>(var: &str) -> Result<Option<T>, ContextError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: String| ContextError::configuration(format!("{}: {}", var, e))),
        Err(_) => Ok(None),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ContextError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    let mut filter = config.filter().map_err(ContextError::configuration)?;
    if let Ok(list) = std::env::var(LOG_MODULES_ENV) {
        for (module, level) in parse_module_levels(&list) {
            let directive = module_directive(module, level)
                .map_err(|e| ContextError::configuration(format!("{}: {}", LOG_MODULES_ENV, e)))?;
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}

fn open_log_file(path: &Path) -> Result<File, ContextError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ContextError::configuration(format!("Failed to create log directory: {}", e))
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            ContextError::configuration(format!("Failed to open log file {}: {}", path.display(), e))
        })
}

/// Install the global subscriber.
///
/// Environment variables override the given config, which overrides the defaults. Fails when a
/// subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ContextError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let filter = build_filter(config)?;
    let format = env_override::<LogFormat>(LOG_FORMAT_ENV)?.unwrap_or(config.format);
    let output = env_override::<LogOutput>(LOG_OUTPUT_ENV)?.unwrap_or(config.output);

    let writer = match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File => BoxMakeWriter::new(std::sync::Mutex::new(open_log_file(&config.file)?)),
    };

    let base = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(writer);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Text => base.with_ansi(config.color && output != LogOutput::File).boxed(),
    };

    Registry::default()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| ContextError::configuration(format!("Failed to install logger: {}", e)))
}
