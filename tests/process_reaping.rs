// tests/process_reaping.rs

//! Becoming a subreaper changes the whole test process, so the real work
//! runs in a re-executed copy of this binary.

#![cfg(target_os = "linux")]

use std::error::Error;
use std::process::Command;
use std::thread::sleep;
use std::time::{Duration, Instant};

use bugger::process;

type TestResult = Result<(), Box<dyn Error>>;

const IN_CHILD: &str = "BUGGER_REAPING_CHILD";

#[test]
fn orphans_are_adopted_and_reaped() -> TestResult {
    if std::env::var_os(IN_CHILD).is_some() {
        return adopt_and_reap();
    }
    let status = Command::new(std::env::current_exe()?)
        .args(["orphans_are_adopted_and_reaped", "--exact", "--test-threads=1"])
        .env(IN_CHILD, "1")
        .status()?;
    assert!(status.success(), "subreaper run failed: {status}");
    Ok(())
}

fn adopt_and_reap() -> TestResult {
    let me = std::process::id();
    process::become_subreaper()?;

    // The shell backgrounds the sleep and exits at once, orphaning it.
    let status = Command::new("/bin/sh")
        .args(["-c", "sleep 30 </dev/null >/dev/null 2>&1 &"])
        .status()?;
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    while process::children_of(me).is_empty() && Instant::now() < deadline {
        sleep(Duration::from_millis(10));
    }
    let adopted = process::children_of(me);
    assert_eq!(adopted.len(), 1, "expected the orphaned sleep, got {adopted:?}");

    assert_eq!(process::reap_children(), 1);
    assert!(process::children_of(me).is_empty());
    assert_eq!(process::parent_pid(adopted[0]), None);
    Ok(())
}
