//! CLI command definitions using clap

use crate::config::ColorChoice;
use crate::logging::LogFormat;
use crate::output::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// idoprobe: end-to-end purchase scenarios for the token-sale dApp
#[derive(Parser, Debug)]
#[command(name = "idoprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (failures only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Suite configuration file (YAML)
    #[arg(short, long, global = true, env = "IDOPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios
    Run(RunArgs),

    /// List scenarios
    List(ListArgs),

    /// Validate a scenario file
    Validate(ValidateArgs),

    /// Show the effective configuration (seed redacted)
    Config,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Only scenarios whose name contains this
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Use the in-process simulation instead of a browser
    #[arg(long)]
    pub simulate: bool,

    /// Run the browser headless
    #[arg(long)]
    pub headless: bool,

    /// Read the seed phrase from this environment variable
    #[arg(long, value_name = "VAR")]
    pub seed_env: Option<String>,

    /// Scenarios run at once (0 = one per core)
    #[arg(short, long, default_value = "1")]
    pub jobs: usize,

    /// Start no new scenario after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Result format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,

    /// Scenario file to run instead of the built-in catalog
    #[arg(short, long)]
    pub scenarios: Option<PathBuf>,

    /// Directory for failure screenshots
    #[arg(long)]
    pub artifacts: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only scenarios whose name contains this
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Scenario file to list instead of the built-in catalog
    #[arg(short, long)]
    pub scenarios: Option<PathBuf>,

    /// Print the scenarios as YAML
    #[arg(long)]
    pub yaml: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Scenario file
    pub file: PathBuf,
}

/// Result format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON on stdout
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Color choice argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
