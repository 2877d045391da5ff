// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the JSON-backed data model.
//! - `loader.rs`: reading the file and expanding `include` groups.
//! - `validate.rs`: structural checks, performed when converting
//!   [`RawConfigFile`] into [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load, load_and_validate, load_from_path};
pub use model::{ConfigFile, GroupConfig, IncludeSpec, RawConfigFile};
