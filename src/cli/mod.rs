// src/cli/mod.rs

use crate::core::configuration::ConfigError;
use thiserror::Error;

pub mod args;
pub mod handlers;

pub use args::{Action, Cli, RunArgs};

/// Invalid invocations, reported before anything is resolved.
#[derive(Error, Debug)]
pub enum UsageError {
    #[error(
        "Flag 'dependency-file' must point to a valid file (dependency-file='{0}'), or enable the 'library' flag to pick up the main target from the library files only."
    )]
    DependencyFileNotFound(String),
    #[error("Flag 'config-file' must point to a valid file (config-file='{0}').")]
    ConfigFileNotFound(String),
    #[error("Flag 'target' cannot be empty when the 'library' flag is set.")]
    LibraryWithoutTarget,
    #[error("Main dependency '{0}' does not exist.")]
    UnknownTarget(String),
    #[error("No target given, and the dependency file does not define any dependency.")]
    NoTarget,
    #[error("Could not expand path '{path}': {reason}")]
    PathExpansion { path: String, reason: String },
    #[error("Could not locate the user configuration directory. Use --home or WDM_HOME.")]
    NoHomeDirectory,
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}
