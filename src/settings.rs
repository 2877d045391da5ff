// src/settings.rs

//! Layered settings lookup.
//!
//! A key is probed in each layer in priority order; the first layer that has
//! it wins. For a command the layers are:
//!
//! 1. top-level descriptor keys (`timeout`, `chdir`, ...)
//! 2. the descriptor's own `settings` object
//! 3. the global `settings` object
//! 4. built-in defaults

use std::time::Duration;

use serde_json::{Map, Value, json};
use tracing::warn;

pub const TIMEOUT: &str = "timeout";
pub const EXIT_ON_FAIL: &str = "exit-on-fail";
pub const EXPECTED_EXIT_CODE: &str = "expected-exit-code";
pub const ANIMATION: &str = "animation";
pub const ENABLE_COLLAPSE: &str = "enable-collapse";
pub const SAVE_OUTPUT: &str = "save-output";
pub const CHDIR: &str = "chdir";

/// Descriptor keys that may also be given at the top level of a command.
pub const COMMAND_LEVEL_KEYS: [&str; 4] = [TIMEOUT, CHDIR, EXPECTED_EXIT_CODE, EXIT_ON_FAIL];

const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Built-in defaults, the lowest-priority layer.
pub fn defaults() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(TIMEOUT.into(), json!(DEFAULT_TIMEOUT_SECS));
    map.insert(EXIT_ON_FAIL.into(), json!(false));
    map.insert(EXPECTED_EXIT_CODE.into(), json!(0));
    map.insert(ANIMATION.into(), json!(true));
    map.insert(ENABLE_COLLAPSE.into(), json!(true));
    map
}

/// Truthiness used for boolean-ish settings: `true`, any non-zero integer, or
/// one of the strings `true` / `on` / `yes` (any case).
pub fn is_true(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().map(|i| i != 0).unwrap_or(false),
        Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "on" | "yes"),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    layers: Vec<Map<String, Value>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layers: vec![defaults()],
        }
    }
}

impl Settings {
    /// Global settings: the given overrides on top of the defaults.
    pub fn global(overrides: Map<String, Value>) -> Self {
        Self {
            layers: vec![overrides, defaults()],
        }
    }

    /// A new stack with `layer` probed before every existing layer.
    pub fn with_layer(&self, layer: Map<String, Value>) -> Self {
        let mut layers = Vec::with_capacity(self.layers.len() + 1);
        layers.push(layer);
        layers.extend(self.layers.iter().cloned());
        Self { layers }
    }

    /// Override a key in the highest-priority layer.
    pub fn set(&mut self, key: &str, value: Value) {
        if self.layers.is_empty() {
            self.layers.push(Map::new());
        }
        self.layers[0].insert(key.to_string(), value);
    }

    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }

    /// `None` means the command may run forever.
    pub fn timeout(&self) -> Option<Duration> {
        match self.lookup(TIMEOUT) {
            None | Some(Value::Null) => None,
            Some(v) => match as_f64(v) {
                Some(secs) if secs > 0.0 => Some(Duration::from_secs_f64(secs)),
                Some(_) => None,
                None => {
                    warn!(value = %v, "invalid timeout setting; using default");
                    Some(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
                }
            },
        }
    }

    pub fn exit_on_fail(&self) -> bool {
        self.lookup(EXIT_ON_FAIL).map(is_true).unwrap_or(false)
    }

    pub fn expected_exit_code(&self) -> i32 {
        match self.lookup(EXPECTED_EXIT_CODE) {
            None => 0,
            Some(v) => as_i32(v).unwrap_or_else(|| {
                warn!(value = %v, "invalid expected-exit-code setting; using 0");
                0
            }),
        }
    }

    pub fn animation(&self) -> bool {
        self.lookup(ANIMATION).map(is_true).unwrap_or(true)
    }

    pub fn enable_collapse(&self) -> bool {
        self.lookup(ENABLE_COLLAPSE).map(is_true).unwrap_or(true)
    }

    /// Destination directory for exported results, if enabled.
    pub fn save_output(&self) -> Option<String> {
        match self.lookup(SAVE_OUTPUT)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    pub fn chdir(&self) -> Option<String> {
        match self.lookup(CHDIR)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// Whole numbers only; `1.5` or values outside `i32` are rejected.
fn as_i32(value: &Value) -> Option<i32> {
    let wide = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    wide.and_then(|w| i32::try_from(w).ok())
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
