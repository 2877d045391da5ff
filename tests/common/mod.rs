#![allow(dead_code)]

pub use bugger_test_utils::builders;
pub use bugger_test_utils::capture;
pub use bugger_test_utils::{init_tracing, with_timeout};

use std::error::Error;

use bugger::config::ConfigFile;
use bugger::engine::{Runner, RunnerOptions};
use bugger::env::Environment;
use bugger::fs::mock::MockFileSystem;

use crate::common::capture::{SharedBuffer, capture_terminal};

pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

/// A runner over an in-memory terminal, plus handles on what it writes.
pub struct Harness {
    pub runner: Runner,
    pub stdout: SharedBuffer,
    pub stderr: SharedBuffer,
    pub fs: MockFileSystem,
}

/// Build a runner for `config` on a `rows` x 200 terminal with the host
/// environment and test-safe options.
pub fn harness(config: &ConfigFile, rows: u16) -> Harness {
    let fs = MockFileSystem::new();
    harness_with(config, rows, builders::test_options(&fs), fs)
}

pub fn harness_with(
    config: &ConfigFile,
    rows: u16,
    options: RunnerOptions,
    fs: MockFileSystem,
) -> Harness {
    let captured = capture_terminal(rows, 200);
    let runner = Runner::new(config, Environment::from_host(), captured.terminal, options)
        .expect("runner builds from a valid config");
    Harness {
        runner,
        stdout: captured.stdout,
        stderr: captured.stderr,
        fs,
    }
}
