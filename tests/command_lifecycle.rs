// tests/command_lifecycle.rs

mod common;
use crate::common::builders::{exec_cmd, system_cmd, with};
use crate::common::{TestResult, init_tracing, with_timeout};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use bugger::command::{Command, CommandState};
use bugger::env::Environment;
use bugger::settings::Settings;

/// Records which hooks fired, in order.
#[derive(Clone, Default)]
struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

fn command(descriptor: Value, events: &Events) -> Command {
    let (e1, e2, e3, e4) = (events.clone(), events.clone(), events.clone(), events.clone());
    Command::new(descriptor, "group", &Settings::default())
        .expect("valid descriptor")
        .on_execute(move |c| e1.push(format!("execute {}", c.name())))
        .on_success(move |c| e2.push(format!("success {}", c.name())))
        .on_failure(move |c, detail| e3.push(format!("failure {}: {detail}", c.name())))
        .on_skip(move |c| e4.push(format!("skip {}", c.name())))
}

async fn run(descriptor: Value) -> (Command, Vec<String>, Environment) {
    init_tracing();
    let events = Events::default();
    let mut cmd = command(descriptor, &events);
    let mut env = Environment::from_host();
    cmd.execute(&mut env).await;
    (cmd, events.take(), env)
}

#[tokio::test]
async fn successful_command_records_output_and_duration() -> TestResult {
    let (cmd, events, _) = run(exec_cmd("echo", "/bin/echo", &["hi"])).await;

    assert_eq!(cmd.state(), CommandState::Successful);
    assert_eq!(cmd.output(), Some(&b"hi\n"[..]));
    assert!(cmd.duration().is_some());
    assert_eq!(cmd.command_str(), Some("/bin/echo hi"));
    assert_eq!(events, ["execute echo", "success echo"]);
    Ok(())
}

#[tokio::test]
async fn stderr_is_captured_with_stdout() -> TestResult {
    let (cmd, _, _) = run(system_cmd("both", "echo out; echo err >&2")).await;
    assert_eq!(cmd.output_text(), "out\nerr\n");
    Ok(())
}

#[tokio::test]
async fn unexpected_exit_code_fails_with_output_as_detail() -> TestResult {
    let (cmd, events, _) = run(system_cmd("bad", "echo broken; exit 3")).await;

    assert_eq!(cmd.state(), CommandState::Failed);
    assert_eq!(events, ["execute bad", "failure bad: broken\n"]);
    assert_eq!(cmd.status_text().as_deref(), Some("Failed"));
    Ok(())
}

#[tokio::test]
async fn expected_exit_code_can_be_non_zero() -> TestResult {
    let (cmd, _, _) = run(with(
        system_cmd("three", "exit 3"),
        json!({ "expected-exit-code": 3 }),
    ))
    .await;
    assert_eq!(cmd.state(), CommandState::Successful);

    let (cmd, _, _) = run(with(
        system_cmd("zero", "exit 0"),
        json!({ "settings": { "expected-exit-code": 1 } }),
    ))
    .await;
    assert_eq!(cmd.state(), CommandState::Failed);
    Ok(())
}

#[tokio::test]
async fn killed_by_signal_is_signaled() -> TestResult {
    let (cmd, events, _) = run(system_cmd("suicide", "kill -9 $$")).await;

    assert_eq!(cmd.state(), CommandState::Signaled);
    assert_eq!(cmd.signal(), Some(9));
    assert_eq!(events[1], "failure suicide: Terminated by signal SIGKILL");
    assert_eq!(
        cmd.status_text().as_deref(),
        Some("Terminated by signal SIGKILL")
    );
    Ok(())
}

#[tokio::test]
async fn timeout_kills_and_still_records_duration() -> TestResult {
    let started = std::time::Instant::now();
    let (cmd, events, _) = run(with(
        system_cmd("slow", "sleep 5"),
        json!({ "timeout": 0.3 }),
    ))
    .await;

    assert_eq!(cmd.state(), CommandState::TimedOut);
    assert!(cmd.duration().is_some_and(|d| d >= Duration::from_millis(300)));
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(events[1], "failure slow: Timed out");
    Ok(())
}

#[tokio::test]
async fn timeout_takes_down_the_whole_process_group() -> TestResult {
    // The backgrounded sleep holds the output pipe open; only a group kill
    // lets the run finish promptly.
    let started = std::time::Instant::now();
    let (cmd, _, _) = with_timeout(run(with(
        system_cmd("forked", "sleep 5 & sleep 5"),
        json!({ "timeout": 0.3 }),
    )))
    .await;
    assert_eq!(cmd.state(), CommandState::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(4));
    Ok(())
}

#[tokio::test]
async fn timeout_covers_output_held_open_by_a_background_job() -> TestResult {
    // The shell exits at once, but its backgrounded sleep keeps the output
    // pipe open well past the timeout.
    let started = std::time::Instant::now();
    let (cmd, events, _) = with_timeout(run(with(
        system_cmd("leaky", "sleep 5 & echo hi"),
        json!({ "timeout": 0.5 }),
    )))
    .await;

    assert_eq!(cmd.state(), CommandState::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(events[1], "failure leaky: Timed out");
    Ok(())
}

#[tokio::test]
async fn detached_background_job_does_not_hold_the_command() -> TestResult {
    let started = std::time::Instant::now();
    let (cmd, _, _) = with_timeout(run(system_cmd(
        "daemon",
        "sleep 3 </dev/null >/dev/null 2>&1 & echo started",
    )))
    .await;

    assert_eq!(cmd.state(), CommandState::Successful);
    assert_eq!(cmd.output_text(), "started\n");
    assert!(started.elapsed() < Duration::from_secs(2));
    Ok(())
}

#[tokio::test]
async fn output_contains_requires_every_substring() -> TestResult {
    let (ok, _, _) = run(with(
        system_cmd("ok", "echo foo bar"),
        json!({ "output-contains": ["foo", "bar"] }),
    ))
    .await;
    assert_eq!(ok.state(), CommandState::Successful);

    let (missing, events, _) = run(with(
        system_cmd("missing", "echo foo"),
        json!({ "output-contains": ["foo", "bar"] }),
    ))
    .await;
    assert_eq!(missing.state(), CommandState::Failed);
    assert_eq!(events[1], "failure missing: foo\n");
    Ok(())
}

#[tokio::test]
async fn output_excludes_rejects_forbidden_text() -> TestResult {
    let (cmd, _, _) = run(with(
        system_cmd("warns", "echo 'warning: x'"),
        json!({ "!output-contains": "warning" }),
    ))
    .await;
    assert_eq!(cmd.state(), CommandState::Failed);
    Ok(())
}

#[tokio::test]
async fn output_matches_joins_lists_with_newlines() -> TestResult {
    let (cmd, _, _) = run(with(
        system_cmd("two", "printf 'a\\nb'"),
        json!({ "output-matches": ["a", "b"] }),
    ))
    .await;
    assert_eq!(cmd.state(), CommandState::Successful);
    assert_eq!(cmd.expected_output().as_deref(), Some("a\nb"));

    let (cmd, _, _) = run(with(
        system_cmd("same", "printf x"),
        json!({ "!output-matches": "x" }),
    ))
    .await;
    assert_eq!(cmd.state(), CommandState::Failed);
    Ok(())
}

#[tokio::test]
async fn failing_success_command_flips_result() -> TestResult {
    let (cmd, events, _) = run(with(
        system_cmd("checked", "true"),
        json!({ "success-command": "exit 1" }),
    ))
    .await;
    assert_eq!(cmd.state(), CommandState::Failed);
    assert_eq!(events[1], "failure checked: Success checking command failed");

    let (cmd, events, _) = run(with(
        system_cmd("checked", "true"),
        json!({ "success-command": "echo nope; exit 1" }),
    ))
    .await;
    assert_eq!(cmd.state(), CommandState::Failed);
    assert_eq!(events[1], "failure checked: nope\n");

    let (cmd, _, _) = run(with(
        system_cmd("checked", "true"),
        json!({ "success-command": "test -n \"$HOME\"" }),
    ))
    .await;
    assert_eq!(cmd.state(), CommandState::Successful);
    Ok(())
}

#[tokio::test]
async fn stdout_to_env_publishes_on_success_only() -> TestResult {
    let (_, _, env) = run(with(
        system_cmd("publish", "printf v1"),
        json!({ "stdout-to-env": "PUBLISHED" }),
    ))
    .await;
    assert_eq!(env.get("PUBLISHED"), Some("v1"));

    let (_, _, env) = run(with(
        system_cmd("publish", "printf v1; exit 1"),
        json!({ "stdout-to-env": "PUBLISHED" }),
    ))
    .await;
    assert_eq!(env.get("PUBLISHED"), None);
    Ok(())
}

#[tokio::test]
async fn descriptor_resolves_against_the_live_environment() -> TestResult {
    init_tracing();
    let events = Events::default();
    let mut cmd = command(
        json!({
            "name": "greet ${WHO}",
            "exec": "/bin/echo",
            "arguments": ["${GREETING}", "${WHO|upper}"],
            "environment": { "GREETING": "hello" }
        }),
        &events,
    );
    let mut env = Environment::from_host();
    env.set("WHO", "world");
    cmd.execute(&mut env).await;

    assert_eq!(cmd.state(), CommandState::Successful);
    assert_eq!(cmd.name(), "greet world");
    assert_eq!(cmd.output_text(), "hello WORLD\n");
    // Command-scoped entries never leak into the shared environment.
    assert_eq!(env.get("GREETING"), None);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shell_expressions_resolve_on_either_runtime_flavour() -> TestResult {
    let descriptor = exec_cmd("greet", "/bin/echo", &["$(printf hi)"]);
    let (on_workers, _, _) = run(descriptor.clone()).await;
    assert_eq!(on_workers.output_text(), "hi\n");

    let (on_current, _, _) = tokio::task::spawn_blocking(move || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime")
            .block_on(run(descriptor))
    })
    .await?;
    assert_eq!(on_current.state(), CommandState::Successful);
    assert_eq!(on_current.output_text(), "hi\n");
    Ok(())
}

#[tokio::test]
async fn resolution_error_fails_without_running() -> TestResult {
    let (cmd, events, _) = run(exec_cmd("broken", "/bin/echo", &["${DOES_NOT_EXIST_ANYWHERE}"])).await;
    assert_eq!(cmd.state(), CommandState::Failed);
    assert_eq!(cmd.output(), None);
    assert_eq!(cmd.output_text(), "<<< NO OUTPUT SET >>>");
    assert_eq!(
        events,
        ["failure broken: Unresolved environment variable: DOES_NOT_EXIST_ANYWHERE"]
    );
    Ok(())
}

#[tokio::test]
async fn spawn_error_fails_the_command() -> TestResult {
    let (cmd, events, _) = run(exec_cmd("ghost", "/definitely/not/here", &[])).await;
    assert_eq!(cmd.state(), CommandState::Failed);
    assert!(events[1].starts_with("failure ghost: spawning process '/definitely/not/here'"));
    Ok(())
}

#[tokio::test]
async fn non_utf8_output_has_a_placeholder() -> TestResult {
    let (cmd, _, _) = run(system_cmd("binary", "printf '\\377\\376'")).await;
    assert_eq!(cmd.output(), Some(&[0xff, 0xfe][..]));
    assert_eq!(cmd.output_text(), "<<< OUTPUT NOT UTF-8 >>>");
    Ok(())
}

#[tokio::test]
async fn chdir_sets_the_working_directory() -> TestResult {
    let dir = tempfile::tempdir()?;
    let expected = dir.path().canonicalize()?;
    let (cmd, _, _) = run(with(
        system_cmd("where", "pwd -P"),
        json!({ "chdir": expected.display().to_string() }),
    ))
    .await;
    assert_eq!(cmd.output_text().trim_end(), expected.display().to_string());
    Ok(())
}

#[tokio::test]
async fn skipped_command_only_fires_skip_hook() -> TestResult {
    init_tracing();
    let events = Events::default();
    let mut cmd = command(exec_cmd("later", "/bin/echo", &["x"]), &events);
    let mut env = Environment::from_host();

    cmd.skip(&env);
    cmd.execute(&mut env).await;

    assert_eq!(cmd.state(), CommandState::Skipped);
    assert_eq!(cmd.output(), None);
    assert_eq!(cmd.command_str(), None);
    assert_eq!(events.take(), ["skip later"]);
    Ok(())
}

#[tokio::test]
async fn terminal_states_never_change() -> TestResult {
    init_tracing();
    let events = Events::default();
    let mut cmd = command(exec_cmd("once", "/bin/echo", &["x"]), &events);
    let mut env = Environment::from_host();

    cmd.execute(&mut env).await;
    cmd.execute(&mut env).await;
    cmd.skip(&env);

    assert_eq!(cmd.state(), CommandState::Successful);
    assert_eq!(events.take(), ["execute once", "success once"]);
    Ok(())
}

#[test]
fn glyphs_follow_state() {
    let events = Events::default();
    let mut cmd = command(exec_cmd("n", "/bin/true", &[]), &events);
    assert_eq!(cmd.render(), "\u{29d6} n");
    cmd.skip(&Environment::new());
    assert_eq!(cmd.render(), "\u{2718} n");
}

#[test]
fn descriptor_shape_is_checked() {
    let settings = Settings::default();
    assert!(Command::new(json!({ "exec": "x" }), "g", &settings).is_err());
    assert!(Command::new(json!({ "name": "x" }), "g", &settings).is_err());
    assert!(Command::new(json!(["not", "an", "object"]), "g", &settings).is_err());
}

#[test]
fn system_command_runs_through_the_shell() {
    let events = Events::default();
    let mut cmd = command(system_cmd("sys", "echo hi"), &events);
    let env = Environment::new().layered([("SHELL", "/bin/bash")]);
    cmd.refresh(&env);
    assert_eq!(cmd.identity().path, "/bin/bash");
    assert_eq!(cmd.identity().args, ["-c", "echo hi"]);
    assert_eq!(cmd.invocation(), "/bin/bash -c echo hi");
}
