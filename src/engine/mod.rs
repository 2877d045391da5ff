// src/engine/mod.rs

//! Orchestration of a whole run.
//!
//! - [`layout`]: the collapse decision and full-screen listings.
//! - [`summary`]: per-state counts and the final line.
//!
//! [`Runner`] owns the groups, the global settings, the shared
//! [`Environment`] and the screen. Commands run strictly one after the
//! other; the only concurrent activity is the animation [`Ticker`], which
//! shares the screen lock with every painter here.

pub mod layout;
pub mod summary;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::command::{Command, value_to_string};
use crate::config::ConfigFile;
use crate::env::Environment;
use crate::errors::Result;
use crate::export;
use crate::fs::{FileSystem, RealFileSystem};
use crate::group::CommandGroup;
use crate::process;
use crate::render::{ActiveLine, Screen, SharedScreen, TICK, Terminal, Ticker, lock};
use crate::settings::{ANIMATION, ENABLE_COLLAPSE, Settings};
use crate::template::Resolver;

pub use summary::Summary;

/// Process-wide behaviour of a run, kept separate from the config so tests
/// can switch off everything that touches other processes.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Kill and reap leftover descendants once the run is over.
    pub reap_children: bool,
    /// End the summary with a newline; `None` detects `entr`/`watch`.
    pub trailing_newline: Option<bool>,
    /// Overrides the `animation` setting.
    pub animation: Option<bool>,
    /// Overrides the `enable-collapse` setting.
    pub collapse: Option<bool>,
    /// Spinner repaint period.
    pub tick: Duration,
    /// Target of `save-output`.
    pub fs: Arc<dyn FileSystem>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            reap_children: true,
            trailing_newline: None,
            animation: None,
            collapse: None,
            tick: TICK,
            fs: Arc::new(RealFileSystem),
        }
    }
}

#[derive(Debug)]
pub struct Runner {
    groups: Vec<CommandGroup>,
    settings: Settings,
    env: Environment,
    screen: SharedScreen,
    options: RunnerOptions,
}

impl Runner {
    /// Build the runner for `config`.
    ///
    /// `host` is the environment the run starts from (normally
    /// [`Environment::from_host`]). Config-level `environment` entries are
    /// resolved in order on top of it; an entry that fails to resolve is
    /// reported on stderr and left out.
    pub fn new(
        config: &ConfigFile,
        host: Environment,
        term: Terminal,
        options: RunnerOptions,
    ) -> Result<Self> {
        let screen = Screen::shared(term);
        let env = config_environment(config, host, &screen);

        let mut settings = global_settings(&config.settings, &env);
        if let Some(animation) = options.animation {
            settings.set(ANIMATION, Value::Bool(animation));
        }
        if let Some(collapse) = options.collapse {
            settings.set(ENABLE_COLLAPSE, Value::Bool(collapse));
        }

        let mut groups = Vec::with_capacity(config.groups.len());
        for group in &config.groups {
            let name = Resolver::new(&env)
                .resolve_str(&group.name)
                .unwrap_or_else(|_| group.name.clone());
            if CommandGroup::is_disabled(&name) {
                debug!(group = %name, "group disabled");
                continue;
            }
            let mut commands = Vec::with_capacity(group.commands.len());
            for descriptor in &group.commands {
                let command = Command::new(descriptor.clone(), name.clone(), &settings)?;
                commands.push(attach_painters(command, &screen));
            }
            groups.push(CommandGroup::new(name, commands));
        }

        let mut runner = Self {
            groups,
            settings,
            env,
            screen,
            options,
        };
        runner.refresh_names();
        Ok(runner)
    }

    pub fn groups(&self) -> &[CommandGroup] {
        &self.groups
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.groups.iter().flat_map(|g| &g.commands)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn screen(&self) -> &SharedScreen {
        &self.screen
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.groups)
    }

    /// Whether the full listing would not fit and collapsing is enabled.
    pub fn should_collapse(&self) -> bool {
        let rows = lock(&self.screen).term.rows();
        layout::should_collapse(self.settings.enable_collapse(), rows, &self.groups)
    }

    /// Run every group and return the process exit code: 0 iff every command
    /// succeeded.
    pub async fn run(&mut self) -> i32 {
        info!(
            groups = self.groups.len(),
            commands = self.commands().count(),
            "run started"
        );

        let collapsed = self.should_collapse();
        layout::paint_pre_run(&mut lock(&self.screen).term, &self.groups, collapsed);

        let ticker = self
            .settings
            .animation()
            .then(|| Ticker::spawn(Arc::clone(&self.screen), self.options.tick));

        lock(&self.screen).term.goto(1, 1);
        for idx in 0..self.groups.len() {
            self.refresh_names();
            if self.should_collapse() {
                layout::paint_collapsed(&mut lock(&self.screen).term, &self.groups);
            } else {
                lock(&self.screen).term.stdout().blue(&self.groups[idx].name).end();
            }
            lock(&self.screen).term.enter();
            self.run_group(idx).await;
            lock(&self.screen).term.leave();
        }
        if self.should_collapse() {
            layout::paint_collapsed(&mut lock(&self.screen).term, &self.groups);
        }

        if let Some(ticker) = ticker {
            ticker.stop().await;
        }

        let summary = self.summary();
        let newline = self
            .options
            .trailing_newline
            .unwrap_or_else(process::trailing_newline);
        summary.paint(lock(&self.screen).term.stdout_writer(), newline);
        info!(%summary, "run finished");

        self.save_results();
        if self.options.reap_children {
            process::reap_children();
        }
        summary.exit_code()
    }

    /// Run one group. Once a command with `exit-on-fail` fails, the rest of
    /// the group is skipped.
    async fn run_group(&mut self, idx: usize) {
        let group = &mut self.groups[idx];
        let env = &mut self.env;
        let mut skipping = false;
        for command in group.commands.iter_mut() {
            if skipping {
                command.skip(env);
            }
            command.execute(env).await;
            if !skipping && command.is_failed() && command.exit_on_fail() {
                info!(
                    group = %group.name,
                    command = %command.name(),
                    "exit-on-fail: skipping the rest of the group"
                );
                skipping = true;
            }
        }
    }

    /// Print every group and the invocation of each of its commands without
    /// running anything.
    pub fn dry_run(&mut self) {
        self.refresh_names();
        let mut screen = lock(&self.screen);
        for group in &self.groups {
            screen.term.stdout().blue(&group.name).end();
            screen.term.enter();
            for command in &group.commands {
                screen
                    .term
                    .stdout()
                    .text(command.name())
                    .text(": ")
                    .blue(command.invocation())
                    .end();
            }
            screen.term.leave();
        }
        debug!("dry run complete (no execution)");
    }

    fn refresh_names(&mut self) {
        for command in self.groups.iter_mut().flat_map(|g| g.commands.iter_mut()) {
            command.refresh(&self.env);
        }
    }

    fn save_results(&self) {
        let Some(root) = self.settings.save_output() else {
            return;
        };
        if let Err(e) = export::save(self.options.fs.as_ref(), Path::new(&root), &self.groups) {
            warn!(root = %root, error = %e, "saving results failed");
            lock(&self.screen)
                .term
                .stderr()
                .red("Could not save results to ")
                .blue(&root)
                .red(": ")
                .blue(format!("{e:#}"))
                .end();
        }
    }
}

/// Host environment plus `BUGGER_FILE`/`BUGGER_DIR` plus the config's own
/// entries, each resolved against everything before it.
fn config_environment(config: &ConfigFile, host: Environment, screen: &SharedScreen) -> Environment {
    let mut env = host.with_config_location(&config.path);
    for (key, value) in &config.environment {
        let resolved = Resolver::new(&env).resolve_value(value);
        match resolved {
            Ok(v) => env.set(key.clone(), value_to_string(&v)),
            Err(e) => {
                warn!(key = %key, error = %e, "config environment entry not resolved");
                lock(screen)
                    .term
                    .stderr()
                    .red("Error normalizing environment variable \"")
                    .blue(key)
                    .red("\"=\"")
                    .blue(value_to_string(value))
                    .red("\" : ")
                    .blue(&e)
                    .end();
            }
        }
    }
    env
}

/// Config-level settings resolved once, over the defaults.
fn global_settings(raw: &Map<String, Value>, env: &Environment) -> Settings {
    let resolver = Resolver::new(env);
    let resolved = raw
        .iter()
        .map(|(key, value)| {
            let value = resolver.resolve_value(value).unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "setting not resolved; using it verbatim");
                value.clone()
            });
            (key.clone(), value)
        })
        .collect();
    Settings::global(resolved)
}

/// Route a command's lifecycle events to the screen.
fn attach_painters(command: Command, screen: &SharedScreen) -> Command {
    let on_execute = Arc::clone(screen);
    let on_success = Arc::clone(screen);
    let on_failure = Arc::clone(screen);
    let on_skip = Arc::clone(screen);

    command
        .on_execute(move |c| {
            lock(&on_execute).set_active(ActiveLine {
                label: c.name().to_string(),
                invocation: c.invocation(),
                spinner: c.spinner(),
            });
        })
        .on_success(move |c| {
            let mut screen = lock(&on_success);
            screen.clear_active();
            screen
                .term
                .stdout()
                .green(c)
                .text(format!(" ({:.3} secs): ", secs(c)))
                .blue(first_line(&c.output_text()))
                .end();
        })
        .on_failure(move |c, detail| {
            let mut screen = lock(&on_failure);
            screen.clear_active();
            screen
                .term
                .stdout()
                .red(c)
                .text(format!(" ({:.3} secs): ", secs(c)))
                .blue(first_line(detail))
                .end();
        })
        .on_skip(move |c| {
            lock(&on_skip).term.stdout().text(c).text(": SKIPPED!").end();
        })
}

fn secs(command: &Command) -> f64 {
    command.duration().map(|d| d.as_secs_f64()).unwrap_or_default()
}

fn first_line(text: &str) -> &str {
    text.split('\n').next().unwrap_or_default()
}
