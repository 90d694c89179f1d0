// src/cli/args.rs

use crate::{cli::UsageError, constants::{DEFAULT_DEPENDENCY_FILE, NO_CONFIG_FILE}, models::RunParameters};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// wdm: Workload Dependency Manager.
///
/// Tests whether the dependencies of a workload are satisfied and installs those that
/// are not. Dependencies, with their test and install tasks, are described in YAML files.
///
/// Return codes:
///   0 the dependencies are all satisfied,
///   1 a test is unsuccessful or an installation failed,
///   2 the command line or the dependency files are invalid.
#[derive(Parser, Debug)]
#[command(
    name = "wdm",
    author,
    version,
    about,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug)]
pub enum Action {
    /// Do not run test nor install tasks, only show what would be done.
    Dryrun(RunArgs),
    /// Only test if the dependencies are satisfied.
    Test(RunArgs),
    /// Test the dependencies and install those unsatisfied.
    Ensure(RunArgs),
    /// List the known dependencies.
    List(RunArgs),
    /// Show an example of command and dependency file.
    Example,
}

/// Flags shared by every mode. Each one falls back to its `WDM_*` environment variable.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Dependency to resolve. If empty, take the first entry of the dependency file.
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Same as TARGET.
    #[arg(long = "target", env = "WDM_TARGET", value_name = "TARGET")]
    pub target_flag: Option<String>,

    /// Path of the dependency file to resolve.
    #[arg(long, env = "WDM_DEPENDENCY_FILE", default_value = DEFAULT_DEPENDENCY_FILE)]
    pub dependency_file: String,

    /// Ansible config file (for Ansible tasks).
    #[arg(long, env = "WDM_ANSIBLE_CONFIG")]
    pub ansible_config: Option<String>,

    /// Pick the main target from the library files; the dependency file can then be omitted.
    #[arg(long, env = "WDM_LIBRARY")]
    pub library: bool,

    /// Comma-separated key=value list of configuration values.
    #[arg(long, env = "WDM_CONFIG")]
    pub config: Option<String>,

    /// File of key=value configuration pairs, one per line.
    /// If empty, loads '.wdm_config' if it exists; 'no' skips loading any config file.
    #[arg(long, env = "WDM_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Directory holding the 'predefined.d' and 'library.d' definitions.
    #[arg(long, env = "WDM_HOME")]
    pub home: Option<String>,
}

/// Expands `~` and `$VAR` in a user-supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf, UsageError> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| UsageError::PathExpansion {
            path: raw.to_string(),
            reason: e.to_string(),
        })
}

impl RunArgs {
    /// Validates the raw flags into the closed set of run parameters.
    pub fn to_parameters(&self) -> Result<RunParameters, UsageError> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        let config_file = match non_empty(&self.config_file) {
            Some(raw) if raw == NO_CONFIG_FILE => Some(raw),
            Some(raw) => Some(expand_path(&raw)?.display().to_string()),
            None => None,
        };

        Ok(RunParameters {
            dependency_file: expand_path(&self.dependency_file)?,
            target: non_empty(&self.target).or_else(|| non_empty(&self.target_flag)),
            ansible_config: non_empty(&self.ansible_config)
                .map(|raw| expand_path(&raw))
                .transpose()?,
            library: self.library,
            config: non_empty(&self.config),
            config_file,
            home: non_empty(&self.home).map(|raw| expand_path(&raw)).transpose()?,
        })
    }
}
