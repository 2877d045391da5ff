// tests/runner_end_to_end.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, exec_cmd, system_cmd, test_options, with};
use crate::common::capture::visible_lines;
use crate::common::{TestResult, harness, harness_with, init_tracing};

use std::path::Path;
use std::time::Duration;

use serde_json::json;

use bugger::command::CommandState;
use bugger::engine::{RunnerOptions, Summary, layout};
use bugger::fs::mock::MockFileSystem;

#[tokio::test]
async fn single_echo_runs_green() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .with_group("build", vec![exec_cmd("echo", "/bin/echo", &["hi"])])
        .build();
    let mut h = harness(&config, 40);

    let code = h.runner.run().await;

    assert_eq!(code, 0);
    let states: Vec<_> = h.runner.commands().map(|c| c.state()).collect();
    assert_eq!(states, [CommandState::Successful]);
    assert_eq!(
        h.runner.summary().to_string(),
        "1 commands. 1 successfull, 0 failed, 0 signaled, 0 timed out, 0 skipped"
    );

    let lines = visible_lines(&h.stdout.contents());
    assert!(lines.iter().any(|l| l.starts_with("\u{2714} echo (") && l.ends_with("secs): hi")));
    assert_eq!(
        lines.last().map(String::as_str),
        Some("1 commands. 1 successfull, 0 failed, 0 signaled, 0 timed out, 0 skipped")
    );
    Ok(())
}

#[tokio::test]
async fn exit_on_fail_skips_the_rest_of_the_group_only() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .with_group(
            "first",
            vec![
                with(system_cmd("boom", "exit 1"), json!({ "exit-on-fail": true })),
                system_cmd("second", "true"),
                system_cmd("third", "true"),
            ],
        )
        .with_group("next", vec![system_cmd("still runs", "true")])
        .build();
    let mut h = harness(&config, 40);

    let code = h.runner.run().await;

    assert_eq!(code, 1);
    let states: Vec<_> = h.runner.commands().map(|c| c.state()).collect();
    assert_eq!(
        states,
        [
            CommandState::Failed,
            CommandState::Skipped,
            CommandState::Skipped,
            CommandState::Successful,
        ]
    );
    let summary = h.runner.summary();
    assert_eq!((summary.failed, summary.skipped, summary.successful), (1, 2, 1));

    let out = h.stdout.plain();
    assert!(out.contains("second: SKIPPED!"));
    assert!(out.contains("third: SKIPPED!"));
    Ok(())
}

#[tokio::test]
async fn failure_without_exit_on_fail_keeps_going() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .with_group(
            "g",
            vec![system_cmd("boom", "echo first line; echo second; exit 2"), system_cmd("after", "true")],
        )
        .build();
    let mut h = harness(&config, 40);

    assert_eq!(h.runner.run().await, 1);
    let states: Vec<_> = h.runner.commands().map(|c| c.state()).collect();
    assert_eq!(states, [CommandState::Failed, CommandState::Successful]);

    let lines = visible_lines(&h.stdout.contents());
    assert!(lines.iter().any(|l| l.starts_with("\u{2718} boom (") && l.ends_with("secs): first line")));
    Ok(())
}

#[tokio::test]
async fn published_output_feeds_later_commands() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .with_group(
            "chain",
            vec![
                with(system_cmd("produce", "printf 42"), json!({ "stdout-to-env": "ANSWER" })),
                exec_cmd("consume ${ANSWER}", "/bin/echo", &["answer=${ANSWER}"]),
            ],
        )
        .build();
    let mut h = harness(&config, 40);

    assert_eq!(h.runner.run().await, 0);
    let consumer = h.runner.commands().nth(1).expect("two commands");
    assert_eq!(consumer.name(), "consume 42");
    assert_eq!(consumer.output_text(), "answer=42\n");
    assert_eq!(h.runner.env().get("ANSWER"), Some("42"));
    Ok(())
}

#[tokio::test]
async fn config_environment_and_location_are_visible() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .with_path("/srv/project/bugger.json")
        .with_env("OUT", "${BUGGER_DIR}/out")
        .with_env("BROKEN", "${NOT_DEFINED_ANYWHERE}")
        .with_group("g", vec![exec_cmd("where", "/bin/echo", &["${OUT}", "${BUGGER_FILE}"])])
        .build();
    let mut h = harness(&config, 40);

    assert_eq!(h.runner.env().get("OUT"), Some("/srv/project/out"));
    assert_eq!(h.runner.env().get("BROKEN"), None);
    assert!(h.stderr.plain().contains("Error normalizing environment variable \"BROKEN\""));

    assert_eq!(h.runner.run().await, 0);
    let cmd = h.runner.commands().next().expect("one command");
    assert_eq!(cmd.output_text(), "/srv/project/out /srv/project/bugger.json\n");
    Ok(())
}

#[tokio::test]
async fn disabled_groups_are_never_built() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .with_group("_off", vec![system_cmd("never", "exit 1")])
        .with_group("on", vec![system_cmd("ok", "true")])
        .build();
    let mut h = harness(&config, 40);

    assert_eq!(h.runner.groups().len(), 1);
    assert_eq!(h.runner.run().await, 0);
    assert!(!h.stdout.plain().contains("never"));
    Ok(())
}

#[tokio::test]
async fn results_are_exported_when_save_output_is_set() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .with_env("RESULTS", "/results")
        .with_setting("save-output", "${RESULTS}")
        .with_group(
            "unit tests",
            vec![
                with(
                    exec_cmd("say hi", "/bin/echo", &["hi"]),
                    json!({ "output-matches": "hi\n" }),
                ),
                with(system_cmd("fail", "exit 1"), json!({ "exit-on-fail": true })),
                system_cmd("skipped one", "true"),
            ],
        )
        .build();
    let fs = MockFileSystem::new();
    let mut h = harness_with(&config, 40, test_options(&fs), fs);

    assert_eq!(h.runner.run().await, 1);

    let dir = Path::new("/results/unit_tests");
    let read = |p: &str| h.fs.get(dir.join(p)).map(|b| String::from_utf8_lossy(&b).into_owned());
    assert_eq!(read("say_hi/command").as_deref(), Some("/bin/echo hi"));
    assert_eq!(read("say_hi/output").as_deref(), Some("hi\n"));
    assert_eq!(read("say_hi/status").as_deref(), Some("Successful"));
    assert_eq!(read("say_hi/output-matches").as_deref(), Some("hi\n"));
    assert_eq!(read("fail/status").as_deref(), Some("Failed"));
    assert_eq!(read("skipped_one/status").as_deref(), Some("Skipped"));
    assert_eq!(read("skipped_one/command"), None);
    assert_eq!(read("skipped_one/output"), None);
    Ok(())
}

#[tokio::test]
async fn collapsed_view_is_used_on_short_terminals() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .with_group("a", vec![system_cmd("a1", "true"), system_cmd("a2", "exit 1")])
        .with_group("b", vec![system_cmd("b1", "true"), system_cmd("b2", "true")])
        .build();
    // 2 headers + 4 commands + summary = 7 lines.
    let mut tall = harness(&config, 7);
    assert!(!tall.runner.should_collapse());

    let mut short = harness(&config, 6);
    assert!(short.runner.should_collapse());

    assert_eq!(short.runner.run().await, 1);
    assert_eq!(tall.runner.run().await, 1);

    // The final collapsed redraw lists the failure under its group.
    let out = short.stdout.plain();
    assert!(out.contains("\u{2718} a2: "));
    Ok(())
}

#[test]
fn collapse_can_be_disabled() -> TestResult {
    let config = ConfigFileBuilder::new()
        .with_setting("enable-collapse", "off")
        .with_group("a", vec![system_cmd("a1", "true"), system_cmd("a2", "true")])
        .build();
    let h = harness(&config, 2);
    assert!(!h.runner.should_collapse());
    Ok(())
}

#[test]
fn dry_run_lists_without_executing() -> TestResult {
    let config = ConfigFileBuilder::new()
        .with_env("TARGET", "release")
        .with_group("build", vec![exec_cmd("cargo ${TARGET}", "cargo", &["build", "--${TARGET}"])])
        .build();
    let mut h = harness(&config, 40);

    h.runner.dry_run();

    let lines = visible_lines(&h.stdout.contents());
    assert_eq!(lines, ["build", "cargo release: cargo build --release"]);
    assert!(h.runner.commands().all(|c| c.state() == CommandState::New));
    Ok(())
}

#[test]
fn line_count_includes_headers_and_summary() {
    let config = ConfigFileBuilder::new()
        .with_group("a", vec![system_cmd("a1", "true")])
        .with_group("b", vec![system_cmd("b1", "true"), system_cmd("b2", "true")])
        .build();
    let h = harness(&config, 40);
    assert_eq!(layout::line_count(h.runner.groups()), 6);
    assert_eq!(layout::current_group(h.runner.groups()), Some(0));
    assert_eq!(Summary::of(h.runner.groups()).total, 3);
}

#[tokio::test]
async fn spinner_repaints_while_a_command_runs() -> TestResult {
    init_tracing();
    let config = ConfigFileBuilder::new()
        .with_group("g", vec![exec_cmd("nap", "/bin/sleep", &["0.3"])])
        .build();
    let fs = MockFileSystem::new();
    let options = RunnerOptions {
        animation: Some(true),
        tick: Duration::from_millis(10),
        ..test_options(&fs)
    };
    let mut h = harness_with(&config, 40, options, fs);

    assert_eq!(h.runner.run().await, 0);

    let out = h.stdout.plain();
    let repaints = out.matches("nap: /bin/sleep 0.3").count();
    assert!(repaints > 3, "expected the spinner to repaint, saw {repaints}");
    let lines = visible_lines(&h.stdout.contents());
    assert!(lines.iter().any(|l| l.starts_with("\u{2714} nap (")));
    assert!(lines.last().is_some_and(|l| l.starts_with("1 commands. 1 successfull")));
    Ok(())
}
