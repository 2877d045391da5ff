// src/process/mod.rs

//! Process-tree housekeeping for the runner itself.
//!
//! The runner registers as a child subreaper at startup so that anything its
//! commands leave behind (daemons, double-forked helpers) is re-parented to
//! it. [`reap_children`] then kills and waits on whatever is still attached
//! once the run is over.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use tracing::{debug, info, warn};

/// Programs that re-run us in a loop and expect no trailing newline.
pub const WATCHERS: [&str; 2] = ["entr", "watch"];

/// Upper bound on reaping passes; each pass handles every current child.
const MAX_REAP_ROUNDS: usize = 64;

/// Adopt orphaned descendants. Linux only; elsewhere this is a no-op.
pub fn become_subreaper() -> Result<()> {
    #[cfg(target_os = "linux")]
    {
        nix::sys::prctl::set_child_subreaper(true).context("registering as child subreaper")?;
        debug!("registered as child subreaper");
    }
    Ok(())
}

/// PIDs whose parent is `parent`, read from `/proc`.
pub fn children_of(parent: u32) -> Vec<u32> {
    let Ok(entries) = fs::read_dir("/proc") else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse::<u32>().ok())
        .filter(|pid| parent_pid(*pid) == Some(parent))
        .collect()
}

/// `PPid` of `pid`, from `/proc/<pid>/status`.
pub fn parent_pid(pid: u32) -> Option<u32> {
    let status = fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("PPid:"))
        .and_then(|v| v.trim().parse().ok())
}

/// Executable paths of every ancestor of `pid`, nearest first.
pub fn ancestor_exes(pid: u32) -> Vec<PathBuf> {
    let mut exes = Vec::new();
    let mut current = parent_pid(pid);
    while let Some(p) = current.filter(|p| *p > 0) {
        if let Ok(exe) = fs::read_link(format!("/proc/{p}/exe")) {
            exes.push(exe);
        }
        current = parent_pid(p);
    }
    exes
}

/// Whether the summary should end with a newline: not when running under
/// `entr` or `watch`, which redraw the screen themselves.
pub fn trailing_newline() -> bool {
    let under_watcher = ancestor_exes(std::process::id()).iter().any(|exe| {
        exe.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| WATCHERS.contains(&n))
    });
    if under_watcher {
        debug!("running under a watcher; omitting trailing newline");
    }
    !under_watcher
}

/// Kill and wait on every remaining child of this process, repeating until
/// none are left (killing one may re-parent its own children to us).
pub fn reap_children() -> usize {
    let me = std::process::id();
    let mut reaped = 0;
    for _ in 0..MAX_REAP_ROUNDS {
        let children = children_of(me);
        if children.is_empty() {
            break;
        }
        for child in children {
            let Ok(raw) = i32::try_from(child) else {
                continue;
            };
            let pid = Pid::from_raw(raw);
            if let Err(e) = kill(pid, Signal::SIGKILL) {
                debug!(pid = child, error = %e, "kill failed");
            }
            match waitpid(pid, None) {
                Ok(status) => {
                    debug!(pid = child, ?status, "reaped descendant");
                    reaped += 1;
                }
                Err(e) => warn!(pid = child, error = %e, "waitpid failed"),
            }
        }
    }
    if reaped > 0 {
        info!(count = reaped, "reaped leftover processes");
    }
    reaped
}
