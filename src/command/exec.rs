// src/command/exec.rs

//! Spawning one child process and waiting for it under a timeout.

use std::fs::File;
use std::io::Read;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::env::Environment;
use crate::template::shell::output_pipe;

/// How long to keep collecting output after a timed-out child was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Everything needed to start one process.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub program: String,
    pub args: Vec<String>,
    pub env: Environment,
    pub cwd: Option<PathBuf>,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The child exited. A negative `code` is the number of the signal that
    /// terminated it.
    Exited { code: i32, output: Vec<u8> },
    /// The timeout elapsed; the child's process group was killed. `output`
    /// holds whatever was captured before that, if it could be drained.
    TimedOut { output: Option<Vec<u8>> },
}

/// Run `request` to completion, capturing stdout and stderr interleaved in
/// one buffer.
///
/// The child leads its own process group so that a timeout can take down
/// everything it spawned.
pub async fn run_process(request: &ProcessRequest) -> Result<ProcessOutcome> {
    let (reader, writer) = output_pipe().context("creating output pipe")?;

    let mut cmd = Command::new(&request.program);
    cmd.args(&request.args)
        .env_clear()
        .envs(request.env.iter())
        .stdin(Stdio::null())
        .stdout(Stdio::from(writer.try_clone().context("duplicating output pipe")?))
        .stderr(Stdio::from(writer))
        .process_group(0)
        .kill_on_drop(true);
    if let Some(dir) = &request.cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process '{}'", request.program))?;
    // Release our copies of the pipe's write end so the reader sees EOF.
    drop(cmd);
    let pid = child.id();
    info!(program = %request.program, pid, "child process started");

    let mut collector = tokio::task::spawn_blocking(move || {
        let mut output = Vec::new();
        File::from(reader).read_to_end(&mut output).map(|_| output)
    });

    // The deadline covers the drain too: a background job that inherited
    // the pipe keeps the command running until it is killed with the group.
    let finished = async {
        let status = child.wait().await.context("waiting for child process")?;
        let output = (&mut collector)
            .await
            .context("joining output reader")?
            .context("reading child output")?;
        anyhow::Ok((status, output))
    };
    let completed = match request.timeout {
        Some(limit) => tokio::time::timeout(limit, finished).await,
        None => Ok(finished.await),
    };

    let (status, output) = match completed {
        Ok(done) => done?,
        Err(_) => {
            warn!(program = %request.program, pid, "timeout elapsed; killing process group");
            kill_group(pid);
            if let Err(e) = child.kill().await {
                debug!(error = %e, "child already gone after group kill");
            }
            let output = match tokio::time::timeout(DRAIN_GRACE, collector).await {
                Ok(Ok(Ok(bytes))) => Some(bytes),
                _ => None,
            };
            return Ok(ProcessOutcome::TimedOut { output });
        }
    };

    let code = exit_code(status);
    debug!(program = %request.program, pid, code, bytes = output.len(), "child process exited");
    Ok(ProcessOutcome::Exited { code, output })
}

/// Exit code, or the negated signal number for a signal death.
pub fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => -signal,
        (None, None) => -1,
    }
}

fn kill_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!(pid, error = %e, "killpg failed");
    }
}

/// `SIGKILL` for 9, or the bare number when unknown.
pub fn signal_name(signal: i32) -> String {
    Signal::try_from(signal)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|_| signal.to_string())
}
