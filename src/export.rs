// src/export.rs

//! Persisting per-command results under the `save-output` directory.
//!
//! Layout, one directory per command:
//!
//! ```text
//! <root>/<group>/<command>/command          quoted command line (if started)
//! <root>/<group>/<command>/output           raw output bytes (if captured)
//! <root>/<group>/<command>/status           human-readable status
//! <root>/<group>/<command>/output-matches   expected output (if configured)
//! ```

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::group::CommandGroup;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid path sanitizing pattern"));

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize(segment: &str) -> String {
    UNSAFE_CHARS.replace_all(segment, "_").into_owned()
}

/// Directory holding one command's result files.
pub fn command_dir(root: &Path, group: &str, command: &str) -> PathBuf {
    root.join(sanitize(group)).join(sanitize(command))
}

/// Write every command of every group under `root`.
pub fn save_results(fs: &dyn FileSystem, root: &Path, groups: &[CommandGroup]) -> Result<usize> {
    let mut written = 0;
    for group in groups {
        for command in &group.commands {
            let dir = command_dir(root, &group.name, command.name());
            fs.create_dir_all(&dir)?;

            if let Some(line) = command.command_str() {
                fs.write(&dir.join("command"), line.as_bytes())?;
            }
            if let Some(output) = command.output() {
                fs.write(&dir.join("output"), output)?;
            }
            if let Some(status) = command.status_text() {
                fs.write(&dir.join("status"), status.as_bytes())?;
            }
            if let Some(expected) = command.expected_output() {
                fs.write(&dir.join("output-matches"), expected.as_bytes())?;
            }

            debug!(group = %group.name, command = %command.name(), dir = ?dir, "saved command result");
            written += 1;
        }
    }
    info!(root = ?root, commands = written, "results saved");
    Ok(written)
}

/// [`save_results`] with the root made absolute first.
pub fn save(fs: &dyn FileSystem, root: &Path, groups: &[CommandGroup]) -> Result<usize> {
    fs.create_dir_all(root)
        .with_context(|| format!("creating output directory {:?}", root))?;
    let root = fs.canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    save_results(fs, &root, groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_everything_but_word_chars() {
        assert_eq!(sanitize("unit tests/part-1"), "unit_tests_part_1");
        assert_eq!(sanitize("ok_Name9"), "ok_Name9");
        assert_eq!(sanitize("é"), "_");
    }

    #[test]
    fn command_dir_nests_group_then_command() {
        let dir = command_dir(Path::new("/out"), "a b", "c.d");
        assert_eq!(dir, PathBuf::from("/out/a_b/c_d"));
    }
}
