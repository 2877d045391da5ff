// src/template/mod.rs

//! Template resolution for command and environment fields.
//!
//! Two reference forms are expanded inside strings:
//!
//! - `${NAME}`, `${NAME:-default}`, `${NAME|filter|filter}`: environment
//!   lookup, optional fallback, then left-to-right string filters.
//! - `$(script)`: the script is run with `/bin/sh -c` and the expression is
//!   replaced by its combined output.
//!
//! The inside of a reference is resolved first, so `${${A}}` looks up the
//! variable named by `A`. Lists and objects are resolved element-wise;
//! numbers, booleans and `null` pass through untouched.

pub mod filters;
pub mod scanner;
pub mod shell;

use serde_json::Value;
use thiserror::Error;

use crate::env::Environment;

pub use filters::{FilterFn, FilterRegistry};
pub use scanner::{RefKind, Reference, find_reference, has_reference};

/// Upper bound on substitutions in one string, so a variable whose value
/// refers to itself cannot expand forever.
pub const MAX_EXPANSIONS: usize = 1024;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Unresolved environment variable: {0}")]
    UnresolvedVariable(String),

    #[error("No such filter: {0}")]
    NoSuchFilter(String),

    #[error("Missing closing bracket")]
    MissingClosingBracket,

    #[error("Could not execute command: {0}")]
    CommandFailed(String),

    #[error("Could not spawn shell for `{script}`: {source}")]
    Shell {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Too many expansions; self-referencing variable?")]
    ExpansionLimit,
}

/// Resolves references against an environment with a given filter registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    env: &'a Environment,
    filters: &'a FilterRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self {
            env,
            filters: FilterRegistry::builtin(),
        }
    }

    pub fn with_filters(mut self, filters: &'a FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    /// Resolve every reference in `s`, re-scanning after each substitution
    /// until none remain.
    pub fn resolve_str(&self, s: &str) -> Result<String, TemplateError> {
        let mut current = s.to_string();
        for _ in 0..MAX_EXPANSIONS {
            let Some(reference) = find_reference(&current)? else {
                return Ok(current);
            };
            let inner = self.resolve_str(reference.inner(&current))?;
            let replacement = match reference.kind {
                RefKind::Variable => self.lookup(&inner)?,
                RefKind::Shell => self.evaluate(&inner)?,
            };
            current.replace_range(reference.start..=reference.end, &replacement);
        }
        Err(TemplateError::ExpansionLimit)
    }

    /// Resolve a JSON value of any shape.
    pub fn resolve_value(&self, value: &Value) -> Result<Value, TemplateError> {
        Ok(match value {
            Value::String(s) => Value::String(self.resolve_str(s)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.resolve_value(v))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.resolve_value(v)?)))
                    .collect::<Result<_, TemplateError>>()?,
            ),
            other => other.clone(),
        })
    }

    /// `NAME[:-default][|filter...]`, already resolved inside.
    fn lookup(&self, expr: &str) -> Result<String, TemplateError> {
        let mut parts = expr.split('|');
        let var_expr = parts.next().unwrap_or_default();

        let (name, default) = match var_expr.split_once(':') {
            Some((name, rest)) => (name, rest.strip_prefix('-')),
            None => (var_expr, None),
        };

        let mut value = match (self.env.get(name), default) {
            (Some(v), _) => v.to_string(),
            (None, Some(d)) => d.to_string(),
            (None, None) => return Err(TemplateError::UnresolvedVariable(name.to_string())),
        };

        for filter_name in parts {
            let f = self
                .filters
                .get(filter_name)
                .ok_or_else(|| TemplateError::NoSuchFilter(filter_name.to_string()))?;
            value = f(&value);
        }
        Ok(value)
    }

    fn evaluate(&self, script: &str) -> Result<String, TemplateError> {
        let (status, output) =
            shell::run_shell(script, self.env).map_err(|source| TemplateError::Shell {
                script: script.to_string(),
                source,
            })?;
        if !status.success() {
            return Err(TemplateError::CommandFailed(script.to_string()));
        }
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

/// Resolve a string with the built-in filters.
pub fn resolve_str(s: &str, env: &Environment) -> Result<String, TemplateError> {
    Resolver::new(env).resolve_str(s)
}

/// Resolve a JSON value with the built-in filters.
pub fn resolve_value(value: &Value, env: &Environment) -> Result<Value, TemplateError> {
    Resolver::new(env).resolve_value(value)
}

/// Filter names written literally in `${...|name}` expressions of `s`.
///
/// Filters whose names are themselves produced by a nested reference are not
/// reported; they can only be checked during resolution.
pub fn literal_filter_names(s: &str) -> Result<Vec<String>, TemplateError> {
    let mut names = Vec::new();
    let mut rest = s;
    while let Some(reference) = find_reference(rest)? {
        let inner = reference.inner(rest);
        names.extend(literal_filter_names(inner)?);
        if reference.kind == RefKind::Variable && !has_reference(inner) {
            names.extend(inner.split('|').skip(1).map(str::to_string));
        }
        rest = &rest[reference.end + 1..];
    }
    Ok(names)
}
