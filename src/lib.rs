#![allow(missing_docs)]

pub mod app_config;
pub mod bootstrap;
pub mod cli;
pub mod commands;
pub mod config;
pub mod format;
pub mod launcher;
pub mod merge;
pub mod picker;
pub mod prompt;
pub mod remote;
pub mod server;
pub mod ssh_args;

pub use app_config::GlobalSettings;
pub use config::{LocalSettings, SettingsProvider, SettingsStore};
pub use format::Format;
pub use merge::{merge_servers, merge_servers_with_source, MergeEngine};
pub use server::{Server, ServerOverride, ServerSource, ServerWithSource, SshOption};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SshyError {
    #[error("server not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("unsupported file format")]
    UnsupportedFormat,

    #[error("Failed to execute {program}: {source}")]
    Command {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl SshyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, SshyError>;
