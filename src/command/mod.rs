// src/command/mod.rs

//! A single runnable step and its lifecycle.
//!
//! - [`state`]: the `CommandState` machine.
//! - [`spec`]: the typed, resolved descriptor and the command's identity.
//! - [`exec`]: spawning and waiting for the child process.
//!
//! A [`Command`] never writes to the terminal itself. Whatever happens is
//! reported through the hooks registered with [`Command::on_execute`],
//! [`Command::on_success`], [`Command::on_failure`] and [`Command::on_skip`];
//! exactly one outcome hook fires per command.

pub mod exec;
pub mod spec;
pub mod state;

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::env::Environment;
use crate::errors::{BuggerError, Result};
use crate::render::{FAILURE, HOURGLASS, SUCCESS, Spinner};
use crate::settings::{COMMAND_LEVEL_KEYS, Settings};
use crate::template::{Resolver, TemplateError};

pub use exec::{ProcessOutcome, ProcessRequest, run_process, signal_name};
pub use spec::{CommandSpec, Identity, TextOrList, value_to_string};
pub use state::CommandState;

/// Shell used for `success-command` checks.
pub const CHECK_SHELL: &str = "/bin/sh";

const NO_OUTPUT: &str = "<<< NO OUTPUT SET >>>";
const NOT_UTF8: &str = "<<< OUTPUT NOT UTF-8 >>>";

pub type CommandHook = Arc<dyn Fn(&Command) + Send + Sync>;
pub type FailureHook = Arc<dyn Fn(&Command, &str) + Send + Sync>;

#[derive(Clone, Default)]
struct Hooks {
    execute: Option<CommandHook>,
    success: Option<CommandHook>,
    failure: Option<FailureHook>,
    skip: Option<CommandHook>,
}

/// How a run ended, before it is applied to the command.
enum Verdict {
    Succeeded,
    /// `None` uses the command's own output as the failure detail.
    Failed(Option<String>),
    Signaled(i32),
    TimedOut,
}

pub struct Command {
    group: String,
    raw: Map<String, Value>,
    global: Settings,
    settings: Settings,
    identity: Identity,
    spec: Option<CommandSpec>,

    state: CommandState,
    output: Option<Vec<u8>>,
    duration: Option<Duration>,
    signal: Option<i32>,
    command_str: Option<String>,
    spinner: Spinner,

    hooks: Hooks,
}

impl Command {
    /// Build a command from its raw (unresolved) descriptor.
    ///
    /// Only the shape is checked here: the descriptor must be an object with
    /// a `name` and one of `exec` / `system`.
    pub fn new(descriptor: Value, group: impl Into<String>, global: &Settings) -> Result<Self> {
        let Value::Object(raw) = descriptor else {
            return Err(BuggerError::ConfigError(
                "command descriptor must be a JSON object".to_string(),
            ));
        };
        if !raw.contains_key("name") {
            return Err(BuggerError::ConfigError(
                "Command missing \"name\"".to_string(),
            ));
        }
        if !(raw.contains_key("exec") || raw.contains_key("system")) {
            return Err(BuggerError::ConfigError(
                "Command missing \"exec\" or \"system\"".to_string(),
            ));
        }

        Ok(Self {
            group: group.into(),
            identity: Identity::unresolved(&raw),
            settings: layered_settings(&raw, global),
            global: global.clone(),
            raw,
            spec: None,
            state: CommandState::New,
            output: None,
            duration: None,
            signal: None,
            command_str: None,
            spinner: Spinner::default(),
            hooks: Hooks::default(),
        })
    }

    pub fn on_execute(mut self, f: impl Fn(&Command) + Send + Sync + 'static) -> Self {
        self.hooks.execute = Some(Arc::new(f));
        self
    }

    pub fn on_success(mut self, f: impl Fn(&Command) + Send + Sync + 'static) -> Self {
        self.hooks.success = Some(Arc::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl Fn(&Command, &str) + Send + Sync + 'static) -> Self {
        self.hooks.failure = Some(Arc::new(f));
        self
    }

    pub fn on_skip(mut self, f: impl Fn(&Command) + Send + Sync + 'static) -> Self {
        self.hooks.skip = Some(Arc::new(f));
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Display name: frozen once execution started, otherwise as of the last
    /// [`Command::refresh`].
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// `path args...` for the terminal.
    pub fn invocation(&self) -> String {
        self.identity.invocation()
    }

    /// Raw combined stdout/stderr, once the child has exited.
    pub fn output(&self) -> Option<&[u8]> {
        self.output.as_deref()
    }

    /// Output as text, with placeholders for missing or non-UTF-8 output.
    pub fn output_text(&self) -> Cow<'_, str> {
        match &self.output {
            None => Cow::Borrowed(NO_OUTPUT),
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => Cow::Borrowed(s),
                Err(_) => Cow::Borrowed(NOT_UTF8),
            },
        }
    }

    /// Wall-clock time of the run; set even on failure and timeout.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Signal number, only for `Signaled` commands.
    pub fn signal(&self) -> Option<i32> {
        self.signal
    }

    /// Quoted command line, once the command has been started.
    pub fn command_str(&self) -> Option<&str> {
        self.command_str.as_deref()
    }

    /// Effective settings (frozen with the rest of the descriptor at start).
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn exit_on_fail(&self) -> bool {
        self.settings.exit_on_fail()
    }

    /// The resolved descriptor, available once execution started.
    pub fn spec(&self) -> Option<&CommandSpec> {
        self.spec.as_ref()
    }

    /// Configured `output-matches` text, if any (lists joined by newlines).
    pub fn expected_output(&self) -> Option<String> {
        if let Some(spec) = &self.spec {
            return spec.output_matches.as_ref().map(TextOrList::joined);
        }
        self.raw
            .get("output-matches")
            .and_then(|v| serde_json::from_value::<TextOrList>(v.clone()).ok())
            .map(|m| m.joined())
    }

    pub fn is_failed(&self) -> bool {
        self.state.is_failure()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Status glyph; the spinner's current frame while executing.
    pub fn glyph(&self) -> char {
        match self.state {
            CommandState::New => HOURGLASS,
            CommandState::Successful => SUCCESS,
            CommandState::Executing => self.spinner.current(),
            _ => FAILURE,
        }
    }

    /// Glyph followed by the name. Advances the spinner when executing.
    pub fn render(&mut self) -> String {
        let glyph = match self.state {
            CommandState::Executing => self.spinner.advance(),
            _ => self.glyph(),
        };
        format!("{glyph} {}", self.identity.name)
    }

    pub fn spinner(&self) -> Spinner {
        self.spinner
    }

    /// Human-readable status, as written by the exporter.
    pub fn status_text(&self) -> Option<String> {
        match self.state {
            CommandState::Successful => Some("Successful".to_string()),
            CommandState::Signaled => Some(format!(
                "Terminated by signal {}",
                signal_name(self.signal.unwrap_or_default())
            )),
            CommandState::Failed => Some("Failed".to_string()),
            CommandState::TimedOut => Some("Timed out".to_string()),
            CommandState::Skipped => Some("Skipped".to_string()),
            CommandState::New | CommandState::Executing => None,
        }
    }

    /// Environment this command runs in: `base` with the descriptor's own
    /// `environment` entries (resolved against `base`) on top.
    pub fn environment(&self, base: &Environment) -> std::result::Result<Environment, TemplateError> {
        command_environment(&self.raw, base)
    }

    /// Re-resolve the display identity against the current environment.
    /// A no-op once execution started.
    pub fn refresh(&mut self, base: &Environment) {
        if self.spec.is_some() {
            return;
        }
        let resolved = self
            .environment(base)
            .and_then(|env| Identity::resolve(&self.raw, &env));
        match resolved {
            Ok(identity) => self.identity = identity,
            Err(e) => debug!(command = %self.identity.name, error = %e, "display name left unresolved"),
        }
    }

    /// Mark as skipped. Only a `New` command can be skipped.
    pub fn skip(&mut self, base: &Environment) {
        if !self.state.can_transition_to(CommandState::Skipped) {
            warn!(command = %self.identity.name, state = ?self.state, "refusing to skip");
            return;
        }
        self.refresh(base);
        self.state = CommandState::Skipped;
        info!(group = %self.group, command = %self.identity.name, "command skipped");
    }

    /// Run the command once.
    ///
    /// A skipped command only fires its skip hook. Otherwise the descriptor
    /// is resolved against `env` (seeing anything earlier commands
    /// published), the child is run, and the outcome is applied. `env` is
    /// written only when the command succeeds and has `stdout-to-env`.
    pub async fn execute(&mut self, env: &mut Environment) {
        if self.state == CommandState::Skipped {
            if let Some(hook) = self.hooks.skip.clone() {
                hook(self);
            }
            return;
        }
        if !self.state.can_transition_to(CommandState::Executing) {
            warn!(command = %self.identity.name, state = ?self.state, "command already ran");
            return;
        }

        self.state = CommandState::Executing;
        let started = Instant::now();

        let verdict = match self.run(env, started).await {
            Ok(verdict) => verdict,
            Err(e) => Verdict::Failed(Some(format!("{e:#}"))),
        };
        if self.duration.is_none() {
            self.duration = Some(started.elapsed());
        }
        self.apply(verdict, env);
    }

    async fn run(&mut self, env: &Environment, started: Instant) -> anyhow::Result<Verdict> {
        // `$(...)` expressions run synchronously; keep them off the async workers.
        let raw = self.raw.clone();
        let base = env.clone();
        let (cmd_env, resolved) = tokio::task::spawn_blocking(move || {
            let cmd_env = command_environment(&raw, &base)?;
            let resolved = Resolver::new(&cmd_env).resolve_value(&Value::Object(raw))?;
            Ok::<_, TemplateError>((cmd_env, resolved))
        })
        .await
        .context("joining template resolution")??;
        let spec: CommandSpec =
            serde_json::from_value(resolved.clone()).context("invalid command descriptor")?;
        if let Value::Object(map) = &resolved {
            self.settings = layered_settings(map, &self.global);
        }
        self.identity = spec.identity(&cmd_env);
        self.command_str = Some(self.identity.command_line());
        self.spec = Some(spec);

        if let Some(hook) = self.hooks.execute.clone() {
            hook(self);
        }

        info!(
            group = %self.group,
            command = %self.identity.name,
            invocation = %self.identity.invocation(),
            "executing command"
        );

        let request = ProcessRequest {
            program: self.identity.path.clone(),
            args: self.identity.args.clone(),
            env: cmd_env.clone(),
            cwd: self.settings.chdir().map(PathBuf::from),
            timeout: self.settings.timeout(),
        };
        let outcome = run_process(&request).await;
        self.duration = Some(started.elapsed());

        match outcome? {
            ProcessOutcome::TimedOut { output } => {
                self.output = output;
                Ok(Verdict::TimedOut)
            }
            ProcessOutcome::Exited { code, output } => {
                self.output = Some(output);
                self.evaluate(code, &cmd_env, request.cwd).await
            }
        }
    }

    async fn evaluate(
        &self,
        code: i32,
        env: &Environment,
        cwd: Option<PathBuf>,
    ) -> anyhow::Result<Verdict> {
        if code != self.settings.expected_exit_code() {
            return Ok(if code < 0 {
                Verdict::Signaled(-code)
            } else {
                Verdict::Failed(None)
            });
        }

        let spec = self
            .spec
            .as_ref()
            .ok_or_else(|| anyhow!("command evaluated before it was resolved"))?;
        let text = self.output_text();

        if let Some(expected) = &spec.output_matches {
            if expected.joined() != text {
                return Ok(Verdict::Failed(None));
            }
        }
        if let Some(unexpected) = &spec.output_not_matches {
            if unexpected.joined() == text {
                return Ok(Verdict::Failed(None));
            }
        }
        if let Some(required) = &spec.output_contains {
            if !required.items().iter().all(|s| text.contains(s)) {
                return Ok(Verdict::Failed(None));
            }
        }
        if let Some(forbidden) = &spec.output_excludes {
            if forbidden.items().iter().any(|s| text.contains(s)) {
                return Ok(Verdict::Failed(None));
            }
        }

        if let Some(check) = &spec.success_command {
            let request = ProcessRequest {
                program: CHECK_SHELL.to_string(),
                args: vec!["-c".to_string(), check.clone()],
                env: env.clone(),
                cwd,
                timeout: None,
            };
            if let ProcessOutcome::Exited { code, output } = run_process(&request).await? {
                if code != 0 {
                    let detail = String::from_utf8_lossy(&output).into_owned();
                    return Ok(Verdict::Failed(Some(if detail.is_empty() {
                        "Success checking command failed".to_string()
                    } else {
                        detail
                    })));
                }
            }
        }

        Ok(Verdict::Succeeded)
    }

    fn apply(&mut self, verdict: Verdict, env: &mut Environment) {
        match verdict {
            Verdict::Succeeded => {
                self.state = CommandState::Successful;
                if let Some(key) = self.spec.as_ref().and_then(|s| s.stdout_to_env.clone()) {
                    debug!(command = %self.identity.name, key = %key, "publishing output");
                    env.set(key, self.output_text().into_owned());
                }
                self.log_finished();
                if let Some(hook) = self.hooks.success.clone() {
                    hook(self);
                }
            }
            Verdict::Signaled(signal) => {
                self.state = CommandState::Signaled;
                self.signal = Some(signal);
                self.fail(format!("Terminated by signal {}", signal_name(signal)));
            }
            Verdict::TimedOut => {
                self.state = CommandState::TimedOut;
                self.fail("Timed out".to_string());
            }
            Verdict::Failed(detail) => {
                self.state = CommandState::Failed;
                let detail = detail.unwrap_or_else(|| self.output_text().into_owned());
                self.fail(detail);
            }
        }
    }

    fn fail(&self, detail: String) {
        self.log_finished();
        if let Some(hook) = self.hooks.failure.clone() {
            hook(self, &detail);
        }
    }

    fn log_finished(&self) {
        info!(
            group = %self.group,
            command = %self.identity.name,
            state = %self.state,
            elapsed_ms = self.duration.map(|d| d.as_millis() as u64).unwrap_or_default(),
            "command finished"
        );
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("group", &self.group)
            .field("name", &self.identity.name)
            .field("state", &self.state)
            .field("duration", &self.duration)
            .field("signal", &self.signal)
            .finish()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.glyph(), self.identity.name)
    }
}

/// `base` with the descriptor's `environment` overlay resolved on top.
fn command_environment(
    raw: &Map<String, Value>,
    base: &Environment,
) -> std::result::Result<Environment, TemplateError> {
    let overlay = match raw.get("environment") {
        Some(Value::Object(map)) => map,
        _ => return Ok(base.clone()),
    };
    let resolver = Resolver::new(base);
    let mut resolved = Vec::with_capacity(overlay.len());
    for (key, value) in overlay {
        resolved.push((key.clone(), value_to_string(&resolver.resolve_value(value)?)));
    }
    Ok(base.layered(resolved))
}

/// Settings for one descriptor: top-level keys, then its `settings` object,
/// then `global`.
fn layered_settings(descriptor: &Map<String, Value>, global: &Settings) -> Settings {
    let own = match descriptor.get("settings") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    let top: Map<String, Value> = COMMAND_LEVEL_KEYS
        .iter()
        .filter_map(|k| descriptor.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect();
    global.with_layer(own).with_layer(top)
}
