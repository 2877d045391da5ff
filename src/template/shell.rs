// src/template/shell.rs

//! Synchronous shell evaluation for `$(...)` expressions.

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::OwnedFd;
use std::process::{Command, ExitStatus, Stdio};

use nix::fcntl::OFlag;
use tracing::debug;

use crate::env::Environment;

/// Shell used for `$(...)` expressions.
pub const SHELL: &str = "/bin/sh";

/// Run `script` with `sh -c` in `env`, returning the exit status and the
/// combined stdout/stderr bytes.
pub fn run_shell(script: &str, env: &Environment) -> io::Result<(ExitStatus, Vec<u8>)> {
    debug!(script = %script, "evaluating shell expression");

    let mut cmd = Command::new(SHELL);
    cmd.arg("-c")
        .arg(script)
        .env_clear()
        .envs(env.iter())
        .stdin(Stdio::null());

    capture_combined(cmd)
}

/// A pipe whose ends are closed on exec, so only the descriptors explicitly
/// handed to a child as stdout/stderr survive into it.
pub fn output_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(OFlag::O_CLOEXEC).map_err(io::Error::from)
}

/// Spawn `cmd` with stdout and stderr sharing one pipe, read it to EOF, then
/// reap the child.
pub fn capture_combined(mut cmd: Command) -> io::Result<(ExitStatus, Vec<u8>)> {
    let (reader, writer) = output_pipe()?;
    cmd.stdout(Stdio::from(writer.try_clone()?))
        .stderr(Stdio::from(writer));

    let mut child = cmd.spawn()?;
    // The write ends live inside `cmd`; drop them so EOF arrives once the
    // child (and anything it forked) closes its copies.
    drop(cmd);

    let mut output = Vec::new();
    File::from(reader).read_to_end(&mut output)?;
    let status = child.wait()?;
    Ok((status, output))
}
