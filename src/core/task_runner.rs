// src/core/task_runner.rs

use crate::{
    core::configuration::ConfigError,
    models::{Dependency, Task, TaskOutcome, TaskRole},
    system::executor::ExecutionError,
};
use thiserror::Error;

/// Errors that prevent a task from being run at all.
///
/// A task that runs and fails is not an error: it is a [`TaskOutcome::Failure`].
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("{0}")]
    Configuration(#[from] ConfigError),
    #[error("Could not find predefined task '{name}'. Available predefined tasks: {}", .available.join(", "))]
    UnknownPredefinedTask { name: String, available: Vec<String> },
    #[error("Predefined tasks call each other in a loop: {chain}")]
    PredefinedLoop { chain: String },
    #[error("Could not serialize the Ansible playbook: {0}")]
    Playbook(#[from] serde_yaml::Error),
    #[error("Could not prepare the Ansible playbook file: {0}")]
    PlaybookFile(#[from] std::io::Error),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Executes individual test and install tasks on behalf of the resolver.
///
/// The resolver never interprets why a task failed, only the reported outcome.
pub trait TaskRunner {
    fn execute(
        &mut self,
        dependency: &Dependency,
        task: &Task,
        role: TaskRole,
    ) -> Result<TaskOutcome, RunnerError>;
}

impl<R: TaskRunner + ?Sized> TaskRunner for &mut R {
    fn execute(
        &mut self,
        dependency: &Dependency,
        task: &Task,
        role: TaskRole,
    ) -> Result<TaskOutcome, RunnerError> {
        (**self).execute(dependency, task, role)
    }
}
