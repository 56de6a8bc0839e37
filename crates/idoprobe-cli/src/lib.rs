//! idoprobe CLI library
//!
//! Argument parsing, configuration, progress output and the glue that turns
//! a parsed command line into a scenario run.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
pub mod runner;

pub use commands::{Cli, ColorArg, Commands, FormatArg, ListArgs, LogFormatArg, RunArgs, ValidateArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_list, OutputFormat, ProgressReporter};
