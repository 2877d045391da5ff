// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `bugger`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bugger",
    version,
    about = "Run groups of commands one by one and report how each of them went.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (JSON).
    #[arg(value_name = "CONFIG", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUGGER_LOG` or `warn` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the config, print every command, run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Disable the spinner regardless of the `animation` setting.
    #[arg(long)]
    pub no_animation: bool,

    /// Never collapse the listing, regardless of `enable-collapse`.
    #[arg(long)]
    pub no_collapse: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
