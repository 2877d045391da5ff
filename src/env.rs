// src/env.rs

//! The environment mapping shared by every command in a run.
//!
//! Seeded from the host environment, extended with the config-file location
//! and config-level `environment` entries, and mutated by commands that
//! publish their output (`stdout-to-env`). It is owned by the runner and
//! handed explicitly to each command; the real process environment is never
//! modified.

use std::collections::BTreeMap;
use std::path::Path;

/// Name of the variable holding the absolute config file path.
pub const FILE_VAR: &str = "BUGGER_FILE";
/// Name of the variable holding the directory of the config file.
pub const DIR_VAR: &str = "BUGGER_DIR";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn from_host() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Inject `BUGGER_FILE` / `BUGGER_DIR` for the given (absolute) config path.
    pub fn with_config_location(mut self, config_path: &Path) -> Self {
        self.set(FILE_VAR, config_path.display().to_string());
        let dir = config_path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.set(DIR_VAR, dir);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Copy of `self` with `overlay` entries shadowing existing ones.
    pub fn layered<I, K, V>(&self, overlay: I) -> Environment
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged = self.clone();
        for (k, v) in overlay {
            merged.set(k, v);
        }
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
