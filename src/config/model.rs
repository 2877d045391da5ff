// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

/// The config file as parsed, before includes are expanded or anything is
/// validated.
///
/// ```json
/// {
///   "environment": { "OUT": "${BUGGER_DIR}/out" },
///   "settings": { "timeout": 30, "save-output": "${OUT}" },
///   "command_groups": {
///     "build": [ { "name": "make", "exec": "make", "arguments": ["-j8"] } ],
///     "tests": { "include": "tests.json", "settings": { "exit-on-fail": true } },
///     "_disabled": [ ... ]
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Absolute path of the file this was read from; set by the loader.
    #[serde(skip)]
    pub path: PathBuf,

    /// Group name -> list of descriptors, or an [`IncludeSpec`] object.
    #[serde(default)]
    pub command_groups: Option<Map<String, Value>>,

    #[serde(default)]
    pub environment: Map<String, Value>,

    #[serde(default)]
    pub settings: Map<String, Value>,
}

/// A group whose commands live in another file.
#[derive(Debug, Clone, Deserialize)]
pub struct IncludeSpec {
    /// Path relative to the including config's directory.
    pub include: String,

    /// Merged under each included descriptor's own `environment`.
    #[serde(default)]
    pub environment: Map<String, Value>,

    /// Merged under each included descriptor's own `settings`.
    #[serde(default)]
    pub settings: Map<String, Value>,
}

/// A validated configuration with every include expanded.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub path: PathBuf,
    /// In declaration order, disabled groups included.
    pub groups: Vec<GroupConfig>,
    /// Config-level environment entries, still unresolved.
    pub environment: Map<String, Value>,
    /// Config-level settings, still unresolved.
    pub settings: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct GroupConfig {
    pub name: String,
    /// Raw command descriptors; each is a JSON object with `name` and
    /// `exec` or `system`.
    pub commands: Vec<Value>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        path: PathBuf,
        groups: Vec<GroupConfig>,
        environment: Map<String, Value>,
        settings: Map<String, Value>,
    ) -> Self {
        Self {
            path,
            groups,
            environment,
            settings,
        }
    }

    pub fn command_count(&self) -> usize {
        self.groups.iter().map(|g| g.commands.len()).sum()
    }
}
