// src/cli/handlers/commons.rs

// Shared loading steps of the `run` and `list` handlers.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::{
    cli::UsageError,
    constants::{DEFAULT_CONFIG_FILE, HOME_DIR_NAME, NO_CONFIG_FILE},
    core::{
        configuration::{self, ConfigLayers},
        population::{DependencyCatalog, Origin},
    },
    models::RunParameters,
};

/// Everything a run needs once the definition files are loaded.
#[derive(Debug)]
pub struct Workspace {
    pub catalog: DependencyCatalog,
    pub config: ConfigLayers,
    /// The first dependency of the primary dependency file, if any.
    pub first_target: Option<String>,
}

/// The WDM home: `--home`, or `wdm/` inside the user configuration directory.
pub fn home_dir(params: &RunParameters) -> Result<PathBuf, UsageError> {
    match &params.home {
        Some(home) => Ok(home.clone()),
        None => dirs::config_dir()
            .map(|dir| dir.join(HOME_DIR_NAME))
            .ok_or(UsageError::NoHomeDirectory),
    }
}

/// The configuration file to load, if any.
///
/// Without `--config-file`, `.wdm_config` is used when it exists in `cwd`.
pub fn config_file_path(raw: Option<&str>, cwd: &Path) -> Result<Option<PathBuf>, UsageError> {
    match raw {
        Some(NO_CONFIG_FILE) => Ok(None),
        Some(path) => {
            let path = cwd.join(path);
            if path.is_file() {
                Ok(Some(path))
            } else {
                Err(UsageError::ConfigFileNotFound(path.display().to_string()))
            }
        }
        None => {
            let default = cwd.join(DEFAULT_CONFIG_FILE);
            Ok(default.is_file().then_some(default))
        }
    }
}

/// Loads the predefined tasks, the library and the primary dependency file, and
/// gathers the configuration layers.
///
/// `listing` relaxes the requirement of a target with `--library`.
pub fn load_workspace(params: &RunParameters, cwd: &Path, listing: bool) -> Result<Workspace> {
    let mut config = ConfigLayers::default();
    if let Some(raw) = &params.config {
        config.cli = configuration::parse_cli_config(raw).map_err(UsageError::from)?;
    }

    let home = home_dir(params)?;
    debug!("Loading definitions from '{}' ...", home.display());
    let mut catalog = DependencyCatalog::new();
    catalog
        .load_home(&home)
        .with_context(|| format!("Failed to load the definitions of '{}'", home.display()))?;

    if params.library && params.target.is_none() && !listing {
        return Err(UsageError::LibraryWithoutTarget.into());
    }

    if let Some(path) = config_file_path(params.config_file.as_deref(), cwd)? {
        info!("Loading configuration from '{}' ...", path.display());
        config.config_file = configuration::load_kv_file(&path).map_err(UsageError::from)?;
    }

    let dependency_file = cwd.join(&params.dependency_file);
    let mut first_target = None;
    if dependency_file.is_file() {
        let (first, file_configuration) = catalog.load_dependency_file(&dependency_file, &Origin::Project)?;
        first_target = first;
        config.dependency_file = file_configuration.unwrap_or_default();
    } else if !params.library {
        return Err(UsageError::DependencyFileNotFound(params.dependency_file.display().to_string()).into());
    }

    Ok(Workspace {
        catalog,
        config,
        first_target,
    })
}
