// src/core/resolver.rs

//! # Resolution Engine
//!
//! Resolves a dependency depth-first:
//!
//! 1. already resolved in this run: nothing to do,
//! 2. the dependency's own configuration keys must all be resolvable,
//! 3. every requirement is resolved, in declaration order (installs included),
//! 4. test tasks run in order until the first success,
//! 5. when no test succeeded, installs are planned (`dryrun`, `test`) or executed
//!    in order (`ensure`), followed by a re-test.
//!
//! Every error is fatal for the whole run. Installs already performed are not rolled back.

use crate::{
    core::{
        configuration::{ConfigError, ConfigLayers},
        population::DependencyCatalog,
        task_runner::{RunnerError, TaskRunner},
    },
    models::{Dependency, Task, TaskOutcome, TaskRole},
    state::{InstallRecord, ResolutionState},
};
use log::{debug, error, info};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Missing required dependency: {}{requirement} (required by '{requester}').", namespace_label(.namespace))]
    MissingDependency {
        requester: String,
        namespace: String,
        requirement: String,
    },
    #[error("Cannot resolve '{dependency}': {source}")]
    MissingConfiguration {
        dependency: String,
        #[source]
        source: ConfigError,
    },
    #[error("Circular requirement detected: {cycle}")]
    Cycle { cycle: String },
    #[error("Installation of '{dependency}' failed: task '{task}' was unsuccessful.")]
    TaskExecution { dependency: String, task: String },
    #[error("'{dependency}' installed, but test still failing.")]
    PostInstallVerification { dependency: String },
    #[error("'{dependency}' test failed, but no install task provided.")]
    UnsatisfiedNoRemediation { dependency: String },
    #[error("Task '{task}' of '{dependency}' could not be run: {source}")]
    Runner {
        dependency: String,
        task: String,
        #[source]
        source: RunnerError,
    },
}

fn namespace_label(namespace: &str) -> String {
    if namespace.is_empty() {
        String::new()
    } else {
        format!("[{}]", namespace)
    }
}

type ResolveResult<T> = Result<T, ResolveError>;

/// Walks the requirement graph of a catalog, delegating task execution to a [`TaskRunner`].
#[derive(Debug)]
pub struct Resolver<'a, R: TaskRunner> {
    catalog: &'a DependencyCatalog,
    config: &'a ConfigLayers,
    runner: R,
}

impl<'a, R: TaskRunner> Resolver<'a, R> {
    pub fn new(catalog: &'a DependencyCatalog, config: &'a ConfigLayers, runner: R) -> Self {
        Self {
            catalog,
            config,
            runner,
        }
    }

    /// Resolves `dependency` and, first, everything it requires.
    ///
    /// Memoized through `state`: a dependency is tested and installed at most once per run.
    pub fn resolve(&mut self, dependency: &Dependency, state: &mut ResolutionState) -> ResolveResult<()> {
        info!("Resolving '{}' dependency ...", dependency.name);

        if state.is_resolved(&dependency.name) {
            info!(
                "Dependency '{}' has already been resolved, skipping.",
                dependency.name
            );
            return Ok(());
        }

        state
            .enter(&dependency.name)
            .map_err(|cycle| ResolveError::Cycle { cycle })?;
        let result = self.resolve_unmemoized(dependency, state);
        state.leave(&dependency.name);
        result?;

        state.mark_resolved(&dependency.name);
        info!("Done with '{}'.", dependency.name);
        Ok(())
    }

    fn resolve_unmemoized(&mut self, dependency: &Dependency, state: &mut ResolutionState) -> ResolveResult<()> {
        if !dependency.spec.configuration.is_empty() {
            self.config
                .resolve_keys(&dependency.config_values, &dependency.spec.configuration)
                .map_err(|source| {
                    error!("Missing required configuration for '{}'.", dependency.name);
                    ResolveError::MissingConfiguration {
                        dependency: dependency.name.clone(),
                        source,
                    }
                })?;
        }

        let catalog = self.catalog;
        for requirement in &dependency.spec.requirements {
            info!("Dependency '{}' needs '{}' ...", dependency.name, requirement);
            let next = catalog
                .find_requirement(&dependency.name, requirement)
                .ok_or_else(|| ResolveError::MissingDependency {
                    requester: dependency.name.clone(),
                    namespace: catalog.prefix_of(&dependency.name).to_string(),
                    requirement: requirement.clone(),
                })?;
            self.resolve(next, state)?;
        }

        if self.test(dependency, state, true)? {
            if !dependency.spec.test.is_empty() {
                debug!("Dependency '{}' is satisfied, no need to install.", dependency.name);
            }
            return Ok(());
        }

        if state.mode().plans_installs() {
            for task in &dependency.spec.install {
                debug!(
                    "Running in {} mode, skipping '{}' installation.",
                    state.mode(),
                    task.name
                );
                state.record_install(dependency.task_key(task), InstallRecord::WouldInstall);
            }
            return Ok(());
        }

        self.install(dependency, state)
    }

    /// Runs the test tasks in order, stopping at the first success.
    ///
    /// Without test tasks, a dependency is satisfied only when it has nothing to install either.
    fn test(&mut self, dependency: &Dependency, state: &mut ResolutionState, announce: bool) -> ResolveResult<bool> {
        if dependency.spec.test.is_empty() {
            let satisfied = dependency.is_trivially_satisfied();
            if announce {
                if satisfied {
                    debug!(
                        "Nothing to test for '{}'. Doesn't have install tasks, we're good.",
                        dependency.name
                    );
                } else {
                    debug!(
                        "Nothing to test for '{}'. Has install tasks, run them.",
                        dependency.name
                    );
                }
            }
            return Ok(satisfied);
        }

        if announce {
            debug!("Testing '{}' ...", dependency.name);
        }
        for task in &dependency.spec.test {
            let outcome = self.execute(dependency, task, TaskRole::Test)?;
            state.record_test(dependency.task_key(task), outcome);
            if outcome.is_success() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn install(&mut self, dependency: &Dependency, state: &mut ResolutionState) -> ResolveResult<()> {
        if dependency.spec.install.is_empty() {
            return Err(ResolveError::UnsatisfiedNoRemediation {
                dependency: dependency.name.clone(),
            });
        }

        info!("Installing '{}' ...", dependency.name);
        for task in &dependency.spec.install {
            let record = match self.execute(dependency, task, TaskRole::Install)? {
                TaskOutcome::Success => InstallRecord::Installed,
                TaskOutcome::Skipped => InstallRecord::WouldInstall,
                TaskOutcome::Failure => {
                    return Err(ResolveError::TaskExecution {
                        dependency: dependency.name.clone(),
                        task: task.name.clone(),
                    });
                }
            };
            state.record_install(dependency.task_key(task), record);
        }

        if !self.test(dependency, state, false)? {
            if !dependency.spec.test.is_empty() {
                return Err(ResolveError::PostInstallVerification {
                    dependency: dependency.name.clone(),
                });
            }
            info!(
                "'{}' installed, but has no test. Continuing nevertheless.",
                dependency.name
            );
        }
        Ok(())
    }

    fn execute(&mut self, dependency: &Dependency, task: &Task, role: TaskRole) -> ResolveResult<TaskOutcome> {
        debug!(
            "Running {} task '{}' ...",
            if role == TaskRole::Test { "test" } else { "install" },
            task.name
        );
        let outcome = self
            .runner
            .execute(dependency, task, role)
            .map_err(|source| match source {
                RunnerError::Configuration(source @ ConfigError::Missing { .. }) => {
                    error!("Missing required configuration for task '{}'.", task.name);
                    ResolveError::MissingConfiguration {
                        dependency: dependency.name.clone(),
                        source,
                    }
                }
                source => ResolveError::Runner {
                    dependency: dependency.name.clone(),
                    task: task.name.clone(),
                    source,
                },
            })?;

        if outcome != TaskOutcome::Skipped {
            info!(
                "{} of '{}': {}",
                role.label(),
                task.name,
                if outcome.is_success() { "Success" } else { "Failed" }
            );
        }
        Ok(outcome)
    }
}
