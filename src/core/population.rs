// src/core/population.rs

//! # Population
//!
//! Loads dependency and predefined-task definitions into a [`DependencyCatalog`].
//!
//! - Predefined tasks (`predefined.d/*`) live in a global registry keyed by task name.
//!   A duplicated name is only a warning: the first definition wins.
//! - Library dependencies (`library.d/<name>.yaml`) are renamed `library.<name>.<dependency>`
//!   so they never collide with the project's own definitions. The prefix is remembered
//!   per dependency, so that requirements declared inside a library file are looked up
//!   in the same library first.
//! - The primary dependency file is loaded without prefix and is the only file allowed
//!   to carry a file-level configuration block.
//!
//! Any invalid document aborts the whole load: dependency files are expected to be
//! version-controlled and internally consistent.

use crate::{
    constants::{LIBRARY_DIR, LIBRARY_PREFIX, PREDEFINED_DIR},
    core::{
        configuration::ConfigValues,
        schema::{self, DependencyDocument},
    },
    models::{Dependency, Task},
};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Deserialize;
use serde_yaml::Value;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PopulateError {
    #[error("Could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not list the definitions in '{path}': {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
    #[error("Failed to parse the YAML file '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error(
        "Invalid document #{index} in '{path}':\n{}\nFaulty YAML entry:\n{record}",
        bullet_list(.violations)
    )]
    SchemaValidation {
        path: String,
        index: usize,
        violations: Vec<String>,
        record: String,
    },
    #[error("File configuration already populated in '{path}': only one document without `spec` is allowed.")]
    DuplicateFileConfiguration { path: String },
    #[error("'{path}' cannot have a file configuration block (document without `spec`).")]
    FileConfigurationNotAllowed { path: String },
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

type PopulateResult<T> = Result<T, PopulateError>;

/// The dependencies of one file, before they are registered in a catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDependencies {
    /// In declaration order, names not prefixed yet.
    pub dependencies: Vec<Dependency>,
    pub file_configuration: Option<ConfigValues>,
}

/// Where a dependency file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// The project's own dependency file.
    Project,
    /// A shared library file; its dependencies are renamed with `prefix`.
    Library { prefix: String },
}

impl Origin {
    fn prefix(&self) -> &str {
        match self {
            Self::Project => "",
            Self::Library { prefix } => prefix.as_str(),
        }
    }
}

/// Parses a stream of YAML documents into raw values, skipping empty ones.
/// Each value comes with its position in the stream (starting at 1).
fn parse_documents(content: &str, source: &str) -> PopulateResult<Vec<(usize, Value)>> {
    let mut documents = Vec::new();
    for (i, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let value = Value::deserialize(document).map_err(|e| PopulateError::Yaml {
            path: source.to_string(),
            source: e,
        })?;
        if !value.is_null() {
            documents.push((i + 1, value));
        }
    }
    Ok(documents)
}

fn schema_error(source: &str, index: usize, doc: &Value, violations: Vec<String>) -> PopulateError {
    PopulateError::SchemaValidation {
        path: source.to_string(),
        index,
        violations,
        record: serde_yaml::to_string(doc).unwrap_or_else(|_| format!("{:?}", doc)),
    }
}

/// Parses and validates the predefined tasks of one file.
pub fn parse_predefined_tasks(content: &str, source: &str) -> PopulateResult<Vec<Task>> {
    parse_documents(content, source)?
        .into_iter()
        .map(|(index, doc)| {
            schema::validate_task(&doc).map_err(|violations| schema_error(source, index, &doc, violations))
        })
        .collect()
}

/// Parses and validates the dependencies of one file.
///
/// At most one document may omit `spec`; it then holds the file configuration values,
/// which only files allowed to (`allow_file_configuration`) may declare.
pub fn parse_dependency_documents(
    content: &str,
    source: &str,
    allow_file_configuration: bool,
) -> PopulateResult<ParsedDependencies> {
    let mut parsed = ParsedDependencies::default();

    for (index, doc) in parse_documents(content, source)? {
        match schema::validate_dependency(&doc)
            .map_err(|violations| schema_error(source, index, &doc, violations))?
        {
            DependencyDocument::Dependency(dependency) => parsed.dependencies.push(dependency),
            DependencyDocument::FileConfiguration(values) => {
                if !allow_file_configuration {
                    return Err(PopulateError::FileConfigurationNotAllowed {
                        path: source.to_string(),
                    });
                }
                if parsed.file_configuration.is_some() {
                    return Err(PopulateError::DuplicateFileConfiguration {
                        path: source.to_string(),
                    });
                }
                parsed.file_configuration = Some(values);
            }
        }
    }

    Ok(parsed)
}

/// The stable prefix given to the dependencies of a library file.
///
/// `gpu.yaml` and `gpu.yml` both give `library.gpu.`; other extensions are kept.
pub fn library_prefix(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match file_name.rsplit_once('.') {
        Some((stem, "yaml" | "yml")) => stem.to_string(),
        _ => file_name.clone(),
    };
    format!("{}{}.", LIBRARY_PREFIX, name)
}

/// All known dependencies and predefined tasks of a run.
#[derive(Debug, Default)]
pub struct DependencyCatalog {
    dependencies: IndexMap<String, Dependency>,
    prefixes: HashMap<String, String>,
    predefined: IndexMap<String, Task>,
}

impl DependencyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Registration ---

    /// Adds predefined tasks to the registry. Returns how many were new.
    pub fn register_predefined(&mut self, tasks: Vec<Task>) -> usize {
        let mut added = 0;
        for task in tasks {
            if self.predefined.contains_key(&task.name) {
                warn!(
                    "Predefined task '{}' already known. Keeping only the first one.",
                    task.name
                );
                continue;
            }
            self.predefined.insert(task.name.clone(), task);
            added += 1;
        }
        added
    }

    /// Adds dependencies, applying the prefix of `origin`.
    /// Returns the final name of the first dependency registered.
    pub fn register_dependencies(
        &mut self,
        dependencies: Vec<Dependency>,
        origin: &Origin,
    ) -> Option<String> {
        let prefix = origin.prefix();
        let mut first_target = None;
        for mut dependency in dependencies {
            dependency.name = format!("{}{}", prefix, dependency.name);
            if self.dependencies.contains_key(&dependency.name) {
                warn!(
                    "Dependency '{}' is defined more than once. Keeping the last definition.",
                    dependency.name
                );
            }
            if first_target.is_none() {
                first_target = Some(dependency.name.clone());
            }
            self.prefixes
                .insert(dependency.name.clone(), prefix.to_string());
            self.dependencies.insert(dependency.name.clone(), dependency);
        }
        first_target
    }

    // --- Loading from disk ---

    pub fn load_predefined_file(&mut self, path: &Path) -> PopulateResult<usize> {
        let content = read_file(path)?;
        let tasks = parse_predefined_tasks(&content, &path.display().to_string())?;
        Ok(self.register_predefined(tasks))
    }

    /// Loads one dependency file.
    ///
    /// Returns the final name of its first dependency, and its file configuration block
    /// (only ever present for [`Origin::Project`]).
    pub fn load_dependency_file(
        &mut self,
        path: &Path,
        origin: &Origin,
    ) -> PopulateResult<(Option<String>, Option<ConfigValues>)> {
        let content = read_file(path)?;
        let parsed = parse_dependency_documents(
            &content,
            &path.display().to_string(),
            *origin == Origin::Project,
        )?;
        debug!(
            "Loaded {} dependencies from '{}'.",
            parsed.dependencies.len(),
            path.display()
        );
        let first_target = self.register_dependencies(parsed.dependencies, origin);
        Ok((first_target, parsed.file_configuration))
    }

    /// Loads `predefined.d/*` then `library.d/*` from the WDM home directory.
    /// Missing directories are simply skipped.
    pub fn load_home(&mut self, home: &Path) -> PopulateResult<()> {
        for path in list_definition_files(&home.join(PREDEFINED_DIR))? {
            self.load_predefined_file(&path)?;
        }
        for path in list_definition_files(&home.join(LIBRARY_DIR))? {
            let origin = Origin::Library {
                prefix: library_prefix(&path),
            };
            self.load_dependency_file(&path, &origin)?;
        }
        Ok(())
    }

    // --- Lookups ---

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.get(name)
    }

    /// Dependency names in registration order.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// The prefix `name` was registered with (empty for project dependencies).
    pub fn prefix_of(&self, name: &str) -> &str {
        self.prefixes.get(name).map(String::as_str).unwrap_or_default()
    }

    pub fn predefined_task(&self, name: &str) -> Option<&Task> {
        self.predefined.get(name)
    }

    pub fn predefined_names(&self) -> impl Iterator<Item = &str> {
        self.predefined.keys().map(String::as_str)
    }

    /// Finds the dependency `requirement` refers to when declared by `requester`:
    /// the name inside the requester's own namespace first, then the bare name.
    pub fn find_requirement(&self, requester: &str, requirement: &str) -> Option<&Dependency> {
        let prefix = self.prefix_of(requester);
        if !prefix.is_empty() {
            if let Some(dependency) = self.get(&format!("{}{}", prefix, requirement)) {
                return Some(dependency);
            }
        }
        self.get(requirement)
    }
}

fn read_file(path: &Path) -> PopulateResult<String> {
    fs::read_to_string(path).map_err(|source| PopulateError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// The regular files directly inside `dir`, sorted by name.
fn list_definition_files(dir: &Path) -> PopulateResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        debug!("No definitions directory at '{}'.", dir.display());
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| PopulateError::Walk {
            path: dir.display().to_string(),
            source,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
