#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use bugger::config::{ConfigFile, RawConfigFile};
use bugger::engine::RunnerOptions;
use bugger::fs::mock::MockFileSystem;
use serde_json::{Map, Value, json};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    groups: Map<String, Value>,
    environment: Map<String, Value>,
    settings: Map<String, Value>,
    path: PathBuf,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            groups: Map::new(),
            environment: Map::new(),
            settings: Map::new(),
            path: PathBuf::from("/tmp/bugger-tests/bugger.json"),
        }
    }

    pub fn with_group(mut self, name: &str, commands: Vec<Value>) -> Self {
        self.groups.insert(name.to_string(), Value::Array(commands));
        self
    }

    pub fn with_env(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.environment.insert(key.to_string(), value.into());
        self
    }

    pub fn with_setting(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.settings.insert(key.to_string(), value.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// The config as it would appear on disk.
    pub fn to_json(&self) -> Value {
        json!({
            "environment": self.environment,
            "settings": self.settings,
            "command_groups": self.groups,
        })
    }

    pub fn build(self) -> ConfigFile {
        let mut raw: RawConfigFile =
            serde_json::from_value(self.to_json()).expect("builder produces a parsable config");
        raw.path = self.path;
        ConfigFile::try_from(raw).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `{ "name": name, "exec": exec, "arguments": args }`
pub fn exec_cmd(name: &str, exec: &str, args: &[&str]) -> Value {
    json!({ "name": name, "exec": exec, "arguments": args })
}

/// `{ "name": name, "system": script }`
pub fn system_cmd(name: &str, script: &str) -> Value {
    json!({ "name": name, "system": script })
}

/// Add extra keys to a descriptor.
pub fn with(mut descriptor: Value, extra: Value) -> Value {
    if let (Value::Object(map), Value::Object(extra)) = (&mut descriptor, extra) {
        map.extend(extra);
    }
    descriptor
}

/// Options that keep a test run away from the rest of the machine: no
/// reaping, no animation, a fixed trailing newline, exports in memory.
pub fn test_options(fs: &MockFileSystem) -> RunnerOptions {
    RunnerOptions {
        reap_children: false,
        trailing_newline: Some(true),
        animation: Some(false),
        collapse: None,
        fs: Arc::new(fs.clone()),
        ..RunnerOptions::default()
    }
}
