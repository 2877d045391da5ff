// src/template/filters.rs

//! Registry of named string transforms usable as `${VAR|name}`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

pub type FilterFn = fn(&str) -> String;

#[derive(Debug, Clone)]
pub struct FilterRegistry {
    filters: BTreeMap<&'static str, FilterFn>,
}

static BUILTIN: LazyLock<FilterRegistry> = LazyLock::new(FilterRegistry::with_builtins);

impl FilterRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            filters: BTreeMap::new(),
        }
    }

    /// Shared registry holding the built-in filters.
    pub fn builtin() -> &'static FilterRegistry {
        &BUILTIN
    }

    /// A fresh registry pre-populated with the built-in filters.
    pub fn with_builtins() -> Self {
        let mut reg = Self::empty();
        reg.register("upper", |s| s.to_uppercase());
        reg.register("lower", |s| s.to_lowercase());
        reg.register("casefold", |s| s.to_lowercase());
        reg.register("strip", |s| s.trim().to_string());
        reg.register("lstrip", |s| s.trim_start().to_string());
        reg.register("rstrip", |s| s.trim_end().to_string());
        reg.register("title", title);
        reg.register("capitalize", capitalize);
        reg.register("swapcase", swapcase);
        reg
    }

    pub fn register(&mut self, name: &'static str, f: FilterFn) {
        self.filters.insert(name, f);
    }

    pub fn get(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

fn swapcase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_uppercase() {
            out.extend(c.to_lowercase());
        } else if c.is_lowercase() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
