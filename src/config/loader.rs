// src/config/loader.rs

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::model::{ConfigFile, IncludeSpec, RawConfigFile};
use crate::errors::{BuggerError, Result};
use crate::fs::{FileSystem, RealFileSystem};

/// Read and parse a config file without expanding includes or validating.
///
/// A path that is not a regular file is [`BuggerError::MissingConfig`], one
/// that cannot be read is [`BuggerError::UnreadableConfig`], and bad JSON is
/// [`BuggerError::InvalidJson`].
pub fn load_from_path(fs: &dyn FileSystem, path: &Path) -> Result<RawConfigFile> {
    if !fs.is_file(path) {
        return Err(BuggerError::MissingConfig(path.to_path_buf()));
    }
    let contents = fs
        .read_to_string(path)
        .map_err(|_| BuggerError::UnreadableConfig(path.to_path_buf()))?;

    let mut config: RawConfigFile =
        serde_json::from_str(&contents).map_err(|source| BuggerError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;
    config.path = fs
        .canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf());
    Ok(config)
}

/// Load, expand includes, and validate.
pub fn load_and_validate(fs: &dyn FileSystem, path: &Path) -> Result<ConfigFile> {
    let mut raw = load_from_path(fs, path)?;
    resolve_includes(fs, &mut raw)?;
    let config = ConfigFile::try_from(raw)?;
    info!(
        path = ?config.path,
        groups = config.groups.len(),
        commands = config.command_count(),
        "configuration loaded"
    );
    Ok(config)
}

/// [`load_and_validate`] on the real filesystem.
pub fn load(path: &Path) -> Result<ConfigFile> {
    load_and_validate(&RealFileSystem, path)
}

/// Replace every include object in `command_groups` by the list it points
/// to, with the include's `environment`/`settings` merged under each
/// descriptor's own.
pub fn resolve_includes(fs: &dyn FileSystem, raw: &mut RawConfigFile) -> Result<()> {
    let base = raw
        .path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let Some(groups) = raw.command_groups.as_mut() else {
        return Ok(());
    };

    for (name, value) in groups.iter_mut() {
        let Value::Object(obj) = value else {
            continue;
        };
        if !obj.contains_key("include") {
            return Err(BuggerError::ConfigError(format!(
                "group '{name}': Missing include"
            )));
        }
        let spec: IncludeSpec = serde_json::from_value(Value::Object(obj.clone())).map_err(|e| {
            BuggerError::ConfigError(format!("group '{name}': invalid include: {e}"))
        })?;
        let path = base.join(&spec.include);
        debug!(group = %name, path = ?path, "expanding include");
        *value = Value::Array(include(fs, &path, &spec)?);
    }
    Ok(())
}

fn include(fs: &dyn FileSystem, path: &Path, spec: &IncludeSpec) -> Result<Vec<Value>> {
    if !fs.is_file(path) {
        return Err(BuggerError::ConfigError(format!(
            "{} is not a file",
            path.display()
        )));
    }
    let contents = fs
        .read_to_string(path)
        .map_err(|_| BuggerError::UnreadableConfig(path.to_path_buf()))?;
    let parsed: Value = serde_json::from_str(&contents).map_err(|source| BuggerError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Array(mut descriptors) = parsed else {
        return Err(BuggerError::ConfigError(format!(
            "{} must contain a list of commands",
            path.display()
        )));
    };

    for descriptor in descriptors.iter_mut() {
        let Value::Object(map) = descriptor else {
            continue;
        };
        for (key, overlay) in [("environment", &spec.environment), ("settings", &spec.settings)] {
            if overlay.is_empty() {
                continue;
            }
            let merged = match map.get(key) {
                Some(Value::Object(own)) => merge_under(overlay, Some(own)),
                _ => merge_under(overlay, None),
            };
            map.insert(key.to_string(), Value::Object(merged));
        }
    }
    Ok(descriptors)
}

/// `base` with `top` laid over it; `top` wins on conflicts.
fn merge_under(base: &Map<String, Value>, top: Option<&Map<String, Value>>) -> Map<String, Value> {
    let mut merged = base.clone();
    if let Some(top) = top {
        for (k, v) in top {
            merged.insert(k.clone(), v.clone());
        }
    }
    merged
}

/// `./bugger.json`.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("./bugger.json")
}
