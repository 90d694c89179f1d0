// src/core/configuration.rs

//! Layered configuration key/value store.
//!
//! Lookup order, highest precedence first:
//! 1. the `args` of the predefined or toolbox call being run, if any,
//! 2. `--config key=value,...` from the command line,
//! 3. values bound on the dependency itself (`config_values`),
//! 4. the file-level configuration block of the primary dependency file,
//! 5. the `key=value` config file (`--config-file` or `.wdm_config`).
//!
//! Values are opaque strings; interpreting them is up to the task implementations.

use indexmap::IndexMap;
use log::warn;
use std::{fs, path::Path};
use thiserror::Error;

pub type ConfigValues = IndexMap<String, String>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration entry in the command line: '{entry}' (expected key=value).")]
    InvalidCliEntry { entry: String },
    #[error("Could not read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "Missing required configuration key(s): {}. Available configuration keys: {}",
        .missing.join(", "),
        join_or_none(.available)
    )]
    Missing {
        missing: Vec<String>,
        available: Vec<String>,
    },
}

fn join_or_none(keys: &[String]) -> String {
    if keys.is_empty() {
        "none".to_string()
    } else {
        keys.join(", ")
    }
}

/// The configuration sources of one run.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    /// Arguments of the predefined calls enclosing the running task, inner calls overriding outer ones.
    pub call: ConfigValues,
    pub cli: ConfigValues,
    pub dependency_file: ConfigValues,
    pub config_file: ConfigValues,
}

impl ConfigLayers {
    /// The layers seen by the task a predefined call runs: its `args` override every other source.
    pub fn with_call_args(&self, args: &ConfigValues) -> ConfigLayers {
        let mut scoped = self.clone();
        scoped.call.extend(args.iter().map(|(k, v)| (k.clone(), v.clone())));
        scoped
    }

    /// Looks `key` up through every layer, `fixed` being the dependency-bound values.
    pub fn lookup<'a>(&'a self, fixed: &'a ConfigValues, key: &str) -> Option<&'a str> {
        [&self.call, &self.cli, fixed, &self.dependency_file, &self.config_file]
            .into_iter()
            .find_map(|layer| layer.get(key))
            .map(String::as_str)
    }

    /// Resolves every key of `keys`, or fails listing all the keys that could not be found.
    pub fn resolve_keys<'k>(
        &self,
        fixed: &ConfigValues,
        keys: impl IntoIterator<Item = &'k String>,
    ) -> Result<ConfigValues, ConfigError> {
        let mut resolved = ConfigValues::new();
        let mut missing: Vec<String> = Vec::new();

        for key in keys {
            match self.lookup(fixed, key) {
                Some(value) => {
                    resolved.insert(key.clone(), value.to_string());
                }
                None if !missing.contains(key) => missing.push(key.clone()),
                None => {}
            }
        }

        if missing.is_empty() {
            Ok(resolved)
        } else {
            Err(ConfigError::Missing {
                missing,
                available: self.available_keys(fixed),
            })
        }
    }

    /// Every key known to at least one layer, in precedence order.
    pub fn available_keys(&self, fixed: &ConfigValues) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for layer in [&self.call, &self.cli, fixed, &self.dependency_file, &self.config_file] {
            for key in layer.keys() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
        keys
    }
}

/// Parses the `--config` comma-separated `key=value` list. Later entries override earlier ones.
pub fn parse_cli_config(arg: &str) -> Result<ConfigValues, ConfigError> {
    let mut values = ConfigValues::new();
    for entry in arg.split(',') {
        if entry.trim().is_empty() {
            continue;
        }
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidCliEntry {
                entry: entry.to_string(),
            })?;
        values.insert(key.trim().to_string(), value.to_string());
    }
    Ok(values)
}

/// Parses `key=value` lines. Invalid lines are skipped, and the first of duplicated keys wins.
pub fn parse_kv_content(content: &str, source: &str) -> ConfigValues {
    let mut values = ConfigValues::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!("Invalid line in {}: {}", source, line);
            continue;
        };
        if values.contains_key(key) {
            warn!(
                "Duplicated entry in {}: {}. Keeping only the first entry.",
                source, key
            );
            continue;
        }
        values.insert(key.to_string(), value.to_string());
    }
    values
}

/// Reads a `key=value` configuration file.
pub fn load_kv_file(path: &Path) -> Result<ConfigValues, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_kv_content(&content, &path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn values(pairs: &[(&str, &str)]) -> ConfigValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_layer_precedence() {
        let layers = ConfigLayers {
            cli: values(&[("a", "cli")]),
            dependency_file: values(&[("a", "file"), ("b", "file"), ("c", "file")]),
            config_file: values(&[("a", "cfg"), ("b", "cfg"), ("c", "cfg"), ("d", "cfg")]),
            ..Default::default()
        };
        let fixed = values(&[("a", "fixed"), ("b", "fixed")]);

        assert_eq!(layers.lookup(&fixed, "a"), Some("cli"));
        assert_eq!(layers.lookup(&fixed, "b"), Some("fixed"));
        assert_eq!(layers.lookup(&fixed, "c"), Some("file"));
        assert_eq!(layers.lookup(&fixed, "d"), Some("cfg"));
        assert_eq!(layers.lookup(&fixed, "e"), None);
    }

    #[test]
    fn test_call_args_override_every_layer() {
        let layers = ConfigLayers {
            cli: values(&[("command", "from-cli"), ("namespace", "gpu")]),
            ..Default::default()
        };
        let fixed = values(&[("command", "fixed")]);

        let outer = layers.with_call_args(&values(&[("command", "deploy"), ("group", "nfd")]));
        let inner = outer.with_call_args(&values(&[("group", "gpu_operator")]));

        assert_eq!(outer.lookup(&fixed, "command"), Some("deploy"));
        assert_eq!(inner.lookup(&fixed, "command"), Some("deploy"));
        assert_eq!(inner.lookup(&fixed, "group"), Some("gpu_operator"));
        assert_eq!(inner.lookup(&fixed, "namespace"), Some("gpu"));
        // The unscoped layers are left untouched.
        assert_eq!(layers.lookup(&fixed, "command"), Some("from-cli"));
    }

    #[test]
    fn test_missing_keys_are_reported_together() {
        let layers = ConfigLayers {
            cli: values(&[("a", "1")]),
            ..Default::default()
        };
        let err = layers
            .resolve_keys(&ConfigValues::new(), &keys(&["a", "b", "c", "b"]))
            .unwrap_err();

        match &err {
            ConfigError::Missing { missing, available } => {
                assert_eq!(missing, &keys(&["b", "c"]));
                assert_eq!(available, &keys(&["a"]));
            }
            other => panic!("Unexpected error: {other}"),
        }
        assert_eq!(
            err.to_string(),
            "Missing required configuration key(s): b, c. Available configuration keys: a"
        );
    }

    #[test]
    fn test_resolve_keys_keeps_requested_order() {
        let layers = ConfigLayers {
            config_file: values(&[("z", "26"), ("y", "25")]),
            ..Default::default()
        };
        let resolved = layers
            .resolve_keys(&ConfigValues::new(), &keys(&["y", "z"]))
            .unwrap();
        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec!["y", "z"]);
    }

    #[test]
    fn test_parse_cli_config() {
        let parsed = parse_cli_config("namespace=gpu,image=quay.io/x:1=2,").unwrap();
        assert_eq!(parsed.get("namespace").map(String::as_str), Some("gpu"));
        assert_eq!(parsed.get("image").map(String::as_str), Some("quay.io/x:1=2"));

        let err = parse_cli_config("namespace=gpu,oops").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCliEntry { ref entry } if entry == "oops"));
    }

    #[test]
    fn test_kv_file_keeps_first_duplicate_and_skips_invalid_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# cluster settings").unwrap();
        writeln!(file, "namespace=first").unwrap();
        writeln!(file, "not a pair").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "namespace=second").unwrap();
        writeln!(file, "replicas=3").unwrap();
        file.flush().unwrap();

        let parsed = load_kv_file(file.path()).unwrap();
        assert_eq!(parsed, values(&[("namespace", "first"), ("replicas", "3")]));
    }

    #[test]
    fn test_kv_file_not_found() {
        let result = load_kv_file(Path::new("non_existent_wdm_config.tmp"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
