// src/errors.rs

//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum BuggerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{} is missing or not a file", .0.display())]
    MissingConfig(PathBuf),

    #[error("Could not open {} for reading", .0.display())]
    UnreadableConfig(PathBuf),

    #[error("{} is not valid JSON", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuggerError>;
