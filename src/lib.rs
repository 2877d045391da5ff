// src/lib.rs

pub mod cli;
pub mod command;
pub mod config;
pub mod engine;
pub mod env;
pub mod errors;
pub mod export;
pub mod fs;
pub mod group;
pub mod logging;
pub mod process;
pub mod render;
pub mod settings;
pub mod template;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::engine::{Runner, RunnerOptions};
use crate::env::Environment;
use crate::errors::{BuggerError, Result};
use crate::render::Terminal;

/// High-level entry point used by `main.rs`; returns the process exit code.
///
/// Configuration load failures are reported on stderr and give exit code 1
/// without running anything.
pub async fn run(args: CliArgs) -> Result<i32> {
    let mut term = Terminal::stdio();
    let config = match config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            info!(error = %err, "configuration not loaded");
            report_load_error(&mut term, &err);
            return Ok(1);
        }
    };

    let options = RunnerOptions {
        animation: args.no_animation.then_some(false),
        collapse: args.no_collapse.then_some(false),
        ..RunnerOptions::default()
    };
    let mut runner = Runner::new(&config, Environment::from_host(), term, options)?;

    if args.dry_run {
        runner.dry_run();
        return Ok(0);
    }

    let code = runner.run().await;
    debug!(code, "exiting");
    Ok(code)
}

/// Print a configuration error the way the terminal listing prints
/// everything else: paths in blue, the complaint in red.
pub fn report_load_error(term: &mut Terminal, err: &BuggerError) {
    let out = term.stderr();
    match err {
        BuggerError::MissingConfig(path) => out
            .blue(path.display())
            .red(" is missing or not a file"),
        BuggerError::UnreadableConfig(path) => out
            .red("Could not open ")
            .blue(path.display())
            .red(" for reading"),
        BuggerError::InvalidJson { path, .. } => {
            out.blue(path.display()).red(" is not valid JSON")
        }
        other => out.red(other),
    }
    .end();
}
