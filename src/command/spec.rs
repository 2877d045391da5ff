// src/command/spec.rs

//! Typed view of a command descriptor after template resolution.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::env::Environment;
use crate::template::{Resolver, TemplateError};

/// Fallback interpreter for `system` commands when `$SHELL` is unset.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// A string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TextOrList {
    Text(String),
    List(Vec<String>),
}

impl TextOrList {
    /// Lists are joined with newlines.
    pub fn joined(&self) -> String {
        match self {
            TextOrList::Text(s) => s.clone(),
            TextOrList::List(items) => items.join("\n"),
        }
    }

    pub fn items(&self) -> Vec<&str> {
        match self {
            TextOrList::Text(s) => vec![s.as_str()],
            TextOrList::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// Command descriptor, as found in the config after resolution.
///
/// Settings-like keys (`timeout`, `chdir`, `expected-exit-code`,
/// `exit-on-fail`) are read through [`Settings`](crate::settings::Settings)
/// instead.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    pub name: String,

    #[serde(default)]
    pub exec: Option<String>,

    #[serde(default)]
    pub arguments: Vec<Value>,

    #[serde(default)]
    pub system: Option<String>,

    #[serde(default)]
    pub environment: Map<String, Value>,

    #[serde(default)]
    pub settings: Map<String, Value>,

    /// Publish the output into this environment variable on success.
    #[serde(default, rename = "stdout-to-env")]
    pub stdout_to_env: Option<String>,

    #[serde(default, rename = "output-matches")]
    pub output_matches: Option<TextOrList>,

    #[serde(default, rename = "!output-matches")]
    pub output_not_matches: Option<TextOrList>,

    #[serde(default, rename = "output-contains")]
    pub output_contains: Option<TextOrList>,

    #[serde(default, rename = "!output-contains")]
    pub output_excludes: Option<TextOrList>,

    /// Shell check run after a successful exit; non-zero fails the command.
    #[serde(default, rename = "success-command")]
    pub success_command: Option<String>,
}

impl CommandSpec {
    pub fn identity(&self, env: &Environment) -> Identity {
        Identity {
            name: self.name.clone(),
            path: program(self.exec.as_deref(), env),
            args: arguments(self.exec.is_some(), &self.arguments, self.system.as_deref()),
        }
    }
}

/// What a command is called and what it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub path: String,
    pub args: Vec<String>,
}

impl Identity {
    /// Resolve just the identity fields of a raw descriptor, for display.
    pub fn resolve(raw: &Map<String, Value>, env: &Environment) -> Result<Self, TemplateError> {
        let resolver = Resolver::new(env);
        let field = |key: &str| -> Result<Option<Value>, TemplateError> {
            raw.get(key).map(|v| resolver.resolve_value(v)).transpose()
        };

        let name = field("name")?.map(|v| value_to_string(&v)).unwrap_or_default();
        let exec = field("exec")?.map(|v| value_to_string(&v));
        let args = match field("arguments")? {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let system = raw.get("system").map(value_to_string);

        Ok(Self {
            name,
            args: arguments(exec.is_some(), &args, system.as_deref()),
            path: program(exec.as_deref(), env),
        })
    }

    /// The descriptor's identity fields taken verbatim.
    pub fn unresolved(raw: &Map<String, Value>) -> Self {
        let name = raw.get("name").map(value_to_string).unwrap_or_default();
        let exec = raw.get("exec").map(value_to_string);
        let args = match raw.get("arguments") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let system = raw.get("system").map(value_to_string);
        Self {
            name,
            args: arguments(exec.is_some(), &args, system.as_deref()),
            path: exec.unwrap_or_else(|| DEFAULT_SHELL.to_string()),
        }
    }

    /// `path args...` on one line, for the terminal.
    pub fn invocation(&self) -> String {
        std::iter::once(&self.path)
            .chain(&self.args)
            .map(|s| s.replace('\n', ""))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Shell-quoted command line, for export.
    pub fn command_line(&self) -> String {
        shell_words::join(std::iter::once(&self.path).chain(&self.args))
    }
}

fn program(exec: Option<&str>, env: &Environment) -> String {
    match exec {
        Some(path) => path.to_string(),
        None => env.get("SHELL").unwrap_or(DEFAULT_SHELL).to_string(),
    }
}

/// `exec` commands take their `arguments`; `system` commands become
/// `-c <script>`.
fn arguments(has_exec: bool, args: &[Value], system: Option<&str>) -> Vec<String> {
    if has_exec {
        args.iter().map(value_to_string).collect()
    } else {
        vec!["-c".to_string(), system.unwrap_or_default().to_string()]
    }
}

/// Render a JSON leaf the way it would appear on a command line.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
