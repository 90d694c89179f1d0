// src/constants.rs

/// The dependency file used when `--dependency-file` is not given.
pub const DEFAULT_DEPENDENCY_FILE: &str = "./dependencies.yaml";

/// Environment files loaded from the working directory at startup, in this order.
/// Variables already set in the environment are never overridden.
pub const ENV_FILES: [&str; 2] = [".wdm_env", ".wdm_env.generated"];

/// The `key=value` configuration file used when `--config-file` is not given.
pub const DEFAULT_CONFIG_FILE: &str = ".wdm_config";

/// `--config-file` value disabling the configuration file entirely.
pub const NO_CONFIG_FILE: &str = "no";

/// The name of the WDM directory inside the user configuration directory.
pub const HOME_DIR_NAME: &str = "wdm";

/// Shared dependency files, one library per file (inside the WDM home).
pub const LIBRARY_DIR: &str = "library.d";

/// Predefined task files (inside the WDM home).
pub const PREDEFINED_DIR: &str = "predefined.d";

/// Prefix of every dependency loaded from a library file: `library.<file stem>.<name>`.
pub const LIBRARY_PREFIX: &str = "library.";

/// The predefined task that `toolbox` tasks are executed through.
pub const TOOLBOX_PREDEFINED_TASK: &str = "run_toolbox";

pub const ANSIBLE_CONFIG_ENV: &str = "ANSIBLE_CONFIG";

pub const LOG_LEVEL_ENV: &str = "LOGLEVEL";

/// Prefix of the temporary playbook files written in the working directory.
pub const PLAYBOOK_PREFIX: &str = ".wdm_playbook_";
