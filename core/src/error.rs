use std::{path::PathBuf, sync::Arc};
use thiserror::Error;

use crate::{parser::ParseError, plugin::PluginError};

#[derive(Debug, Error)]
pub enum Error {
    /// The source file could not be read (missing, permission denied, not UTF-8).
    #[error("Failed to read source file {}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The parser rejected the content of the source file.
    #[error("Failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// A metadata plugin reported an error.
    #[error("Metadata plugin '{plugin}' failed for {}", .path.display())]
    Plugin {
        plugin: String,
        path: PathBuf,
        #[source]
        source: PluginError,
    },

    /// The folded metadata could not be represented as the catalog's metadata type.
    #[error("Invalid metadata for {}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid glob pattern")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to list source files: {0}")]
    Listing(String),

    #[error("Filesystem watch error")]
    Watch(#[from] notify::Error),

    /// The initial scan failed. Every caller waiting on the scan receives the same error.
    #[error("Initial scan failed")]
    InitialScan(#[source] Arc<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;
