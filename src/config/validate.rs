// src/config/validate.rs

use serde_json::{Map, Value};

use crate::config::model::{ConfigFile, GroupConfig, RawConfigFile};
use crate::errors::{BuggerError, Result};
use crate::group::CommandGroup;
use crate::template::{FilterRegistry, literal_filter_names};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuggerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let groups = validate_groups(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.path,
            groups,
            raw.environment,
            raw.settings,
        ))
    }
}

fn validate_groups(raw: &RawConfigFile) -> Result<Vec<GroupConfig>> {
    let Some(groups) = &raw.command_groups else {
        return Err(BuggerError::ConfigError(
            "No command groups section found".to_string(),
        ));
    };

    let mut out = Vec::with_capacity(groups.len());
    for (name, value) in groups {
        let commands = match value {
            Value::Array(items) => items,
            Value::Object(_) => {
                return Err(BuggerError::ConfigError(format!(
                    "group '{name}': include was not expanded"
                )));
            }
            _ => {
                return Err(BuggerError::ConfigError(format!(
                    "group '{name}' must be a list of commands or an include object"
                )));
            }
        };
        // Disabled groups are never built, so they may be half-written.
        if !CommandGroup::is_disabled(name) {
            for (idx, descriptor) in commands.iter().enumerate() {
                validate_descriptor(name, idx, descriptor)?;
            }
        }
        out.push(GroupConfig {
            name: name.clone(),
            commands: commands.clone(),
        });
    }
    Ok(out)
}

fn validate_descriptor(group: &str, idx: usize, descriptor: &Value) -> Result<()> {
    let Value::Object(map) = descriptor else {
        return Err(BuggerError::ConfigError(format!(
            "group '{group}', command #{idx}: expected an object"
        )));
    };
    if !map.contains_key("name") {
        return Err(BuggerError::ConfigError(format!(
            "group '{group}', command #{idx}: Command missing \"name\""
        )));
    }
    if !(map.contains_key("exec") || map.contains_key("system")) {
        return Err(BuggerError::ConfigError(format!(
            "group '{group}', command #{idx}: Command missing \"exec\" or \"system\""
        )));
    }
    if let Some(filter) = unknown_filter(map) {
        return Err(BuggerError::ConfigError(format!(
            "group '{group}', command #{idx}: No such filter: {filter}"
        )));
    }
    Ok(())
}

/// First literally-written filter name that is not registered.
///
/// Strings that do not scan (e.g. an unterminated bracket) are left for the
/// resolver to report when the command runs.
fn unknown_filter(map: &Map<String, Value>) -> Option<String> {
    let registry = FilterRegistry::builtin();
    let mut pending: Vec<&Value> = map.values().collect();
    while let Some(value) = pending.pop() {
        match value {
            Value::String(s) => {
                let names = literal_filter_names(s).unwrap_or_default();
                if let Some(bad) = names.into_iter().find(|n| !registry.contains(n)) {
                    return Some(bad);
                }
            }
            Value::Array(items) => pending.extend(items),
            Value::Object(inner) => pending.extend(inner.values()),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(groups: Value) -> RawConfigFile {
        serde_json::from_value(json!({ "command_groups": groups })).unwrap()
    }

    #[test]
    fn missing_command_groups_is_rejected() {
        let err = ConfigFile::try_from(RawConfigFile::default()).unwrap_err();
        assert!(err.to_string().contains("No command groups section found"));
    }

    #[test]
    fn group_order_follows_declaration() {
        let cfg = ConfigFile::try_from(raw(json!({
            "zeta": [{ "name": "a", "exec": "true" }],
            "alpha": [{ "name": "b", "system": "true" }],
        })))
        .unwrap();
        let names: Vec<_> = cfg.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn descriptor_needs_exec_or_system() {
        let err = ConfigFile::try_from(raw(json!({ "g": [{ "name": "a" }] }))).unwrap_err();
        assert!(err.to_string().contains("\"exec\" or \"system\""));
    }

    #[test]
    fn disabled_groups_are_not_checked() {
        let cfg = ConfigFile::try_from(raw(json!({
            "_off": [{ "name": "half-written" }, { "name": "x", "exec": "${A|shout}" }],
            "on": [{ "name": "ok", "exec": "/bin/true" }],
        })))
        .unwrap();
        let names: Vec<_> = cfg.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["_off", "on"]);
    }

    #[test]
    fn unknown_literal_filter_is_rejected() {
        let err = ConfigFile::try_from(raw(json!({
            "g": [{ "name": "a", "exec": "echo", "arguments": ["${HOME|shout}"] }]
        })))
        .unwrap_err();
        assert!(err.to_string().contains("No such filter: shout"));
    }

    #[test]
    fn computed_filter_names_are_left_to_runtime() {
        ConfigFile::try_from(raw(json!({
            "g": [{ "name": "a", "exec": "echo", "arguments": ["${HOME|${F}}"] }]
        })))
        .unwrap();
    }
}
